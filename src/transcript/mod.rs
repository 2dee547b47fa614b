use anyhow::Result;
use chrono::Utc;
use serde_json::{json, to_string_pretty};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::apply::write_atomic;
use crate::session::Outcome;

#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptFlags {
    pub save_request: bool,
    pub save_response: bool,
}

impl TranscriptFlags {
    pub fn any(self) -> bool {
        self.save_request || self.save_response
    }
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub response: Option<PathBuf>,
}

pub fn tx_dir(data_dir: &Path, tx: Uuid) -> PathBuf {
    data_dir.join("tx").join(tx.to_string())
}

/// Writes `request.json` (request + prompts) and/or `response.json` + `App.jsx`.
pub fn save_generation(data_dir: &Path, tx: Uuid, outcome: &Outcome, flags: TranscriptFlags) -> Result<SavedPaths> {
    let dir = tx_dir(data_dir, tx);
    let mut request = None;
    let mut response = None;

    if flags.save_request {
        let p = dir.join("request.json");
        let body = json!({
            "tx": tx,
            "timestamp": Utc::now(),
            "request": outcome.request,
            "systemPrompt": outcome.system_prompt,
            "userPrompt": outcome.user_prompt,
        });
        write_atomic(&p, to_string_pretty(&body)?.as_bytes())?;
        request = Some(p);
    }

    if flags.save_response {
        let p = dir.join("response.json");
        write_atomic(&p, to_string_pretty(&outcome.result)?.as_bytes())?;
        write_atomic(&dir.join("App.jsx"), outcome.result.normalized_source_text().as_bytes())?;
        response = Some(p);
    }

    Ok(SavedPaths { dir, request, response })
}

pub fn describe(saved: &SavedPaths) -> Vec<String> {
    let mut lines = vec![format!("artifacts: {}", saved.dir.display())];
    lines.extend(saved.request.as_ref().map(|p| format!("request saved at: {}", p.display())));
    lines.extend(saved.response.as_ref().map(|p| format!("response saved at: {}", p.display())));
    lines
}
