use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{credential, transport, upstream_status, Provider};
use crate::config::Config;
use crate::errors::ForgeError;

pub const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    pub model: String,
    pub api_base: String,
    pub key_env: String,
    pub api_key: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    client: Client,
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Msg<'a>; 1],
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

impl Anthropic {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            model: cfg.model.clone(),
            api_base: cfg.api_base.clone().unwrap_or_else(|| ANTHROPIC_BASE.to_string()),
            key_env: cfg.api_key_env.clone().unwrap_or_else(|| "ANTHROPIC_API_KEY".to_string()),
            api_key: None,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for Anthropic {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ForgeError> {
        let key = self
            .api_key
            .clone()
            .or_else(|| credential(&self.key_env))
            .ok_or_else(|| ForgeError::missing_credential(&self.key_env))?;

        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        let body = MsgRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: [Msg { role: "user", content: user }],
        };
        log::debug!("anthropic: POST {url}");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("anthropic", e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| transport("anthropic", e))?;
        log::debug!("anthropic: status {status}");

        if !status.is_success() {
            return Err(upstream_status("anthropic", status, &text));
        }

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| ForgeError::Upstream(format!("anthropic response parse error: {e}")))?;
        Ok(parsed
            .content
            .into_iter()
            .filter(|b| b.r#type == "text")
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
