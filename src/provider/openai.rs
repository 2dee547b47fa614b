use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{credential, transport, upstream_status, Provider};
use crate::config::Config;
use crate::errors::ForgeError;

pub const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenRouter and OpenAI, which share a wire format.
pub struct OpenAiCompatible {
    label: &'static str,
    model: String,
    api_base: String,
    key_env: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
    headers: Vec<(&'static str, String)>,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Msg<'a>; 2],
    max_tokens: u32,
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
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatible {
    fn build(label: &'static str, default_base: &str, default_env: &str, cfg: &Config) -> Self {
        Self {
            label,
            model: cfg.model.clone(),
            api_base: cfg.api_base.clone().unwrap_or_else(|| default_base.to_string()),
            key_env: cfg.api_key_env.clone().unwrap_or_else(|| default_env.to_string()),
            api_key: None,
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            headers: Vec::new(),
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn openrouter(cfg: &Config) -> Self {
        let mut p = Self::build("openrouter", OPENROUTER_BASE, "OPENROUTER_API_KEY", cfg);
        p.headers.push(("HTTP-Referer", cfg.app_referer.clone()));
        p.headers.push(("X-Title", cfg.app_title.clone()));
        p
    }

    pub fn openai(cfg: &Config) -> Self {
        Self::build("openai", OPENAI_BASE, "OPENAI_API_KEY", cfg)
    }

    /// Uses `key` instead of reading the credential variable.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl Provider for OpenAiCompatible {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ForgeError> {
        let key = self
            .api_key
            .clone()
            .or_else(|| credential(&self.key_env))
            .ok_or_else(|| ForgeError::missing_credential(&self.key_env))?;

        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: [Msg { role: "system", content: system }, Msg { role: "user", content: user }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        log::debug!("{}: POST {url} (model {})", self.label, self.model);

        let mut req = self.client.post(&url).bearer_auth(key).json(&body);
        for (name, value) in &self.headers {
            req = req.header(*name, value);
        }
        let resp = req.send().await.map_err(|e| transport(self.label, e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| transport(self.label, e))?;
        log::debug!("{}: status {status}, {} bytes", self.label, text.len());

        if !status.is_success() {
            return Err(upstream_status(self.label, status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ForgeError::Upstream(format!("failed to parse {} response: {e}", self.label)))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }
}
