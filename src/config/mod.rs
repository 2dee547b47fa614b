use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::ProviderKind;

pub const DEFAULT_CONFIG_FILE: &str = "shopforge.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    pub api_base: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub data_dir: String,
    pub store_namespace: String,
    pub app_title: String,
    pub app_referer: String,
    pub ollama_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenRouter,
            model: "openai/gpt-3.5-turbo".into(),
            api_base: None,
            api_key_env: None,
            timeout_secs: 120,
            max_tokens: 1500,
            temperature: 0.6,
            data_dir: ".shopforge".into(),
            store_namespace: "shopforge-pages".into(),
            app_title: "ShopForge".into(),
            app_referer: "http://localhost:3000".into(),
            ollama_url: Some("http://localhost:11434".into()),
        }
    }
}

impl Config {
    /// Explicit path must exist; otherwise `shopforge.toml` in `cwd` is used when present.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    log::debug!("config: no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };
        let text = fs_err::read_to_string(&path)?;
        let cfg: Config = toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
        log::debug!("config: loaded {}", path.display());
        Ok(cfg)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
