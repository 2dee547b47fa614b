use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{transport, upstream_status, Provider};
use crate::config::Config;
use crate::errors::ForgeError;

pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Local models; no credential involved.
pub struct Ollama {
    pub model: String,
    pub url: String,
    pub temperature: f32,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Msg<'a>; 2],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<MsgOut>,
}

#[derive(Deserialize)]
struct MsgOut {
    #[serde(default)]
    content: String,
}

impl Ollama {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            model: cfg.model.clone(),
            url: cfg.ollama_url.clone().unwrap_or_else(|| OLLAMA_URL.to_string()),
            temperature: cfg.temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ForgeError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [Msg { role: "system", content: system }, Msg { role: "user", content: user }],
            stream: false,
            options: OllamaOptions { temperature: self.temperature },
        };
        log::debug!("ollama: POST {url}");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport("ollama", e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| transport("ollama", e))?;

        if !status.is_success() {
            return Err(upstream_status("ollama", status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ForgeError::Upstream(format!("ollama response parse error: {e}")))?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}
