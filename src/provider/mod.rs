use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::errors::ForgeError;

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// One completion round-trip. An empty completion is `Ok("")`, not an error.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn complete(&self, system: &str, user: &str) -> Result<String, ForgeError>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

/// Reads the credential variable; blank values count as missing.
pub(crate) fn credential(var: &str) -> Option<String> {
    std::env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Pulls a readable message out of `{"error":{"message":..}}`, `{"error":".."}` or `{"message":..}`.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    let msg = match v.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        None => v.get("message").and_then(Value::as_str).map(str::to_string),
    };
    msg.filter(|m| !m.trim().is_empty())
}

pub(crate) fn upstream_status(provider: &str, status: reqwest::StatusCode, body: &str) -> ForgeError {
    let detail = extract_error_message(body).unwrap_or_else(|| body.trim().chars().take(300).collect());
    ForgeError::Upstream(format!("{provider} API error ({status}): {detail}"))
}

pub(crate) fn transport(provider: &str, e: reqwest::Error) -> ForgeError {
    ForgeError::Upstream(format!("{provider} request failed: {e}"))
}

pub fn make_provider(kind: ProviderKind, cfg: &Config) -> DynProvider {
    match kind {
        ProviderKind::OpenRouter => Box::new(openai::OpenAiCompatible::openrouter(cfg)),
        ProviderKind::OpenAI => Box::new(openai::OpenAiCompatible::openai(cfg)),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::from_config(cfg)),
        ProviderKind::Ollama => Box::new(ollama::Ollama::from_config(cfg)),
    }
}

/// Bounded, cancellable access to a provider.
pub struct Gateway {
    provider: DynProvider,
    timeout: Duration,
}

impl Gateway {
    pub fn new(provider: DynProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(make_provider(cfg.provider, cfg), Duration::from_secs(cfg.timeout_secs))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Timeouts and cancellation surface as `Upstream`; nothing is retried.
    pub async fn complete(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String, ForgeError> {
        log::debug!("gateway: sending completion to {}", self.provider.name());
        tokio::select! {
            _ = cancel.cancelled() => Err(ForgeError::Upstream("request cancelled".into())),
            res = tokio::time::timeout(self.timeout, self.provider.complete(system, user)) => match res {
                Ok(out) => out,
                Err(_) => Err(ForgeError::Upstream(format!(
                    "{} did not answer within {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                ))),
            },
        }
    }
}
