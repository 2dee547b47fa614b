use anyhow::{Context, Result};
use fs_err as fs;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub created: usize,
    pub updated: usize,
    pub bytes_written: u64,
    pub paths: Vec<PathBuf>,
}

/// Replaces `path` in one step: write a sibling temp file, then rename over.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = NamedTempFile::new_in(parent)?;
    fs::write(tmp.path(), data)?;
    tmp.persist(path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

/// Joins a virtual path (`/App.jsx`, `app/page.tsx`) under `root`, refusing `..` escapes.
pub fn resolve_under(root: &Path, virtual_path: &str) -> Result<PathBuf> {
    let rel = Path::new(virtual_path.trim_start_matches('/'));
    if rel.as_os_str().is_empty() || rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        anyhow::bail!("refusing to write outside {}: {virtual_path}", root.display());
    }
    Ok(root.join(rel))
}

/// Writes every `(virtual path, content)` pair under `root`.
pub fn write_files<'a>(root: &Path, files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<WriteSummary> {
    let mut sum = WriteSummary::default();
    for (virtual_path, content) in files {
        let abs = resolve_under(root, virtual_path)?;
        let existed = abs.exists();
        write_atomic(&abs, content.as_bytes())?;
        if existed {
            sum.updated += 1;
        } else {
            sum.created += 1;
        }
        sum.bytes_written += content.len() as u64;
        sum.paths.push(abs);
    }
    Ok(sum)
}
