use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::apply::{write_atomic, write_files};
use crate::errors::ForgeError;
use crate::wire::DeviceClass;

pub const ENTRY_PATH: &str = "/index.jsx";
pub const HTML_PATH: &str = "/index.html";
pub const COMPONENT_PATH: &str = "/App.jsx";
pub const TEMPLATE: &str = "vite-react";
pub const SANDBOX_MANIFEST: &str = "sandbox.json";

const DEPENDENCIES: [(&str, &str); 2] = [("lucide-react", "latest"), ("framer-motion", "latest")];

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>Preview</title>
    <script src="https://cdn.tailwindcss.com"></script>
  </head>
  <body>
    <div id="root"></div>
    <script type="module" src="/index.jsx"></script>
  </body>
</html>
"#;

const INDEX_JSX: &str = r#"import React from "react";
import { createRoot } from "react-dom/client";
import App from "./App";

const root = createRoot(document.getElementById("root"));
root.render(<App />);
"#;

pub const PLACEHOLDER: &str = r#"import React from "react";

export default function App() {
  return (
    <div className="flex min-h-screen items-center justify-center bg-zinc-100 p-8 text-center">
      <p className="text-zinc-500 font-medium">Generate a page to see the live preview.</p>
    </div>
  );
}
"#;

/// Virtual files plus the bundler setup and frame they need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewFileSet {
    pub files: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub template: String,
    pub container: ContainerStyle,
}

impl PreviewFileSet {
    pub fn component(&self) -> &str {
        self.files.get(COMPONENT_PATH).map(String::as_str).unwrap_or_default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.component() == PLACEHOLDER
    }
}

/// Builds the three-file set framed for `device`; blank or absent source falls
/// back to the placeholder.
///
/// `normalized` is expected to be normalizer output; it is copied in as is.
pub fn assemble(normalized: Option<&str>, device: DeviceClass) -> PreviewFileSet {
    let component = normalized.filter(|s| !s.trim().is_empty()).unwrap_or(PLACEHOLDER);
    let files = BTreeMap::from([
        (ENTRY_PATH.to_string(), INDEX_JSX.to_string()),
        (HTML_PATH.to_string(), INDEX_HTML.to_string()),
        (COMPONENT_PATH.to_string(), component.to_string()),
    ]);
    let dependencies = DEPENDENCIES.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    PreviewFileSet { files, dependencies, template: TEMPLATE.to_string(), container: container_style(device) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub side_px: u32,
    pub top_px: u32,
    pub bottom_px: u32,
    pub radius: &'static str,
    pub shadow: bool,
}

/// Presentation-only framing around the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStyle {
    pub max_width_px: Option<u32>,
    pub frame: Option<Frame>,
    pub class: &'static str,
}

pub fn container_style(device: DeviceClass) -> ContainerStyle {
    match device {
        DeviceClass::Mobile => ContainerStyle {
            max_width_px: Some(375),
            frame: Some(Frame { side_px: 8, top_px: 16, bottom_px: 16, radius: "3rem", shadow: true }),
            class: "max-w-[375px] mx-auto shadow-2xl border-x-[8px] border-t-[16px] border-b-[16px] border-black rounded-[3rem]",
        },
        DeviceClass::Tablet => ContainerStyle {
            max_width_px: Some(768),
            frame: Some(Frame { side_px: 4, top_px: 4, bottom_px: 4, radius: "0.75rem", shadow: false }),
            class: "max-w-[768px] mx-auto border-[4px] border-black rounded-xl",
        },
        DeviceClass::Desktop => ContainerStyle { max_width_px: None, frame: None, class: "w-full" },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPreview {
    pub location: String,
}

/// External bundler/runtime that executes a file set.
pub trait SandboxRuntime {
    fn render(&self, files: &PreviewFileSet) -> anyhow::Result<RenderedPreview>;
}

/// Hands `files` to `runtime`; any failure it reports is a render error, never retried.
pub fn render_preview(runtime: &dyn SandboxRuntime, files: &PreviewFileSet) -> Result<RenderedPreview, ForgeError> {
    runtime.render(files).map_err(|e| {
        log::warn!("preview: sandbox reported {e:#}");
        ForgeError::PreviewRender(format!("{e:#}"))
    })
}

/// Materialises a file set into a directory for an external bundler to pick up.
pub struct DirectorySandbox {
    pub root: PathBuf,
}

impl DirectorySandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn manifest(files: &PreviewFileSet) -> serde_json::Value {
        json!({
            "template": files.template,
            "dependencies": files.dependencies,
            "entry": ENTRY_PATH,
            "container": files.container,
        })
    }
}

impl SandboxRuntime for DirectorySandbox {
    fn render(&self, files: &PreviewFileSet) -> anyhow::Result<RenderedPreview> {
        let written = write_files(&self.root, files.files.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        let manifest = serde_json::to_vec_pretty(&Self::manifest(files))?;
        write_atomic(&self.root.join(SANDBOX_MANIFEST), &manifest)?;
        log::debug!("preview: wrote {} files ({} bytes) to {}", written.paths.len(), written.bytes_written, self.root.display());
        Ok(RenderedPreview { location: index_location(&self.root) })
    }
}

fn index_location(root: &Path) -> String {
    root.join(HTML_PATH.trim_start_matches('/')).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_err as fs;

    #[test]
    fn absent_or_blank_source_uses_placeholder() {
        for src in [None, Some(""), Some("  \n")] {
            let set = assemble(src, DeviceClass::Desktop);
            assert_eq!(set.files.len(), 3);
            assert!(set.is_placeholder());
            assert!(set.component().contains("Generate a page to see the live preview."));
        }
    }

    #[test]
    fn emits_exactly_the_three_fixed_files() {
        let code = "import React from \"react\";\n\nexport default function App() { return <main/>; }\n";
        let set = assemble(Some(code), DeviceClass::Desktop);
        let paths: Vec<_> = set.files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec![COMPONENT_PATH, HTML_PATH, ENTRY_PATH]);
        assert_eq!(set.component(), code);
        assert!(set.files[HTML_PATH].contains("cdn.tailwindcss.com"));
        assert!(set.files[HTML_PATH].contains("src=\"/index.jsx\""));
        assert!(set.files[ENTRY_PATH].contains("import App from \"./App\""));
        assert_eq!(set.dependencies["framer-motion"], "latest");
        assert_eq!(set.template, "vite-react");
    }

    #[test]
    fn only_desktop_is_unconstrained() {
        assert_eq!(container_style(DeviceClass::Desktop).max_width_px, None);
        assert_eq!(container_style(DeviceClass::Tablet).max_width_px, Some(768));
        let mobile = container_style(DeviceClass::Mobile);
        assert_eq!(mobile.max_width_px, Some(375));
        assert_eq!(mobile.frame.map(|f| (f.side_px, f.top_px)), Some((8, 16)));
        assert!(mobile.class.contains("rounded-[3rem]"));
    }

    #[test]
    fn file_set_carries_the_device_frame() {
        let set = assemble(None, DeviceClass::Mobile);
        assert_eq!(set.container, container_style(DeviceClass::Mobile));
        assert_eq!(assemble(None, DeviceClass::Desktop).container.frame, None);
        assert_eq!(set.files, assemble(None, DeviceClass::Tablet).files);
    }

    struct Broken;

    impl SandboxRuntime for Broken {
        fn render(&self, _: &PreviewFileSet) -> anyhow::Result<RenderedPreview> {
            anyhow::bail!("SyntaxError: Unexpected token (3:4)")
        }
    }

    #[test]
    fn sandbox_failures_become_preview_render_errors() {
        let err = render_preview(&Broken, &assemble(None, DeviceClass::Mobile)).unwrap_err();
        assert_eq!(err, ForgeError::PreviewRender("SyntaxError: Unexpected token (3:4)".into()));
    }

    #[test]
    fn directory_sandbox_writes_files_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = DirectorySandbox::new(dir.path());
        let out = render_preview(&sandbox, &assemble(None, DeviceClass::Tablet)).unwrap();
        assert!(out.location.ends_with("index.html"));
        assert!(fs::read_to_string(dir.path().join("App.jsx")).unwrap().contains("export default function App"));
        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(SANDBOX_MANIFEST)).unwrap()).unwrap();
        assert_eq!(manifest["template"], "vite-react");
        assert_eq!(manifest["container"]["maxWidthPx"], 768);
        assert_eq!(manifest["dependencies"]["lucide-react"], "latest");
    }
}
