use anyhow::Result;
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::apply::write_atomic;
use crate::wire::PageVariant;

pub const EXPORT_FOLDER: &str = "shopforge-export";

const PAGE_TSX: &str = r#""use client";

import Page from "./PageComponent";

export default function Home() {
  return <Page />;
}
"#;

const GLOBALS_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

const LAYOUT_JSX: &str = r#"import "./globals.css";

export default function RootLayout({ children }) {
  return (
    <html lang="en">
      <body>{children}</body>
    </html>
  );
}
"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
module.exports = {
  content: ['./app/**/*.{js,ts,jsx,tsx}'],
  theme: { extend: {} },
  plugins: [],
};
"#;

const POSTCSS_CONFIG: &str = "module.exports = { plugins: { tailwindcss: {}, autoprefixer: {} } };\n";

fn package_json() -> String {
    let manifest = json!({
        "name": EXPORT_FOLDER,
        "private": true,
        "scripts": { "dev": "next dev", "build": "next build", "start": "next start" },
        "dependencies": {
            "next": "14",
            "react": "^18",
            "react-dom": "^18",
            "lucide-react": "latest",
            "framer-motion": "latest"
        },
        "devDependencies": {
            "tailwindcss": "^3",
            "postcss": "^8",
            "autoprefixer": "^10",
            "typescript": "^5",
            "@types/react": "^18"
        }
    });
    // serde_json's pretty printer never fails on a Value
    format!("{}\n", serde_json::to_string_pretty(&manifest).unwrap_or_default())
}

fn readme(variant: PageVariant) -> String {
    format!(
        "# ShopForge Export\n\n{} generated with ShopForge.\n\n`npm install` then `npm run dev`\n",
        variant.label()
    )
}

/// The Next.js project layout, relative to the archive root.
pub fn project_files(normalized: &str, variant: PageVariant) -> Vec<(String, String)> {
    let at = |p: &str| format!("{EXPORT_FOLDER}/{p}");
    vec![
        (at("app/page.tsx"), PAGE_TSX.to_string()),
        (at("app/PageComponent.jsx"), normalized.to_string()),
        (at("app/globals.css"), GLOBALS_CSS.to_string()),
        (at("app/layout.jsx"), LAYOUT_JSX.to_string()),
        (at("package.json"), package_json()),
        (at("tailwind.config.js"), TAILWIND_CONFIG.to_string()),
        (at("postcss.config.js"), POSTCSS_CONFIG.to_string()),
        (at("README.md"), readme(variant)),
    ]
}

pub fn build_archive(normalized: &str, variant: PageVariant) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (path, content) in project_files(normalized, variant) {
        zip.start_file(path, options)?;
        zip.write_all(content.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

pub fn archive_name(variant: PageVariant, epoch_millis: i64) -> String {
    format!("shopforge-{}-{epoch_millis}.zip", variant.as_str())
}

/// Writes the archive into `dir` and returns its path.
pub fn write_archive(dir: &Path, normalized: &str, variant: PageVariant, epoch_millis: i64) -> Result<PathBuf> {
    let bytes = build_archive(normalized, variant)?;
    let path = dir.join(archive_name(variant, epoch_millis));
    write_atomic(&path, &bytes)?;
    log::info!("export: wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
