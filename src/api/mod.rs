//! The generation endpoint contract, independent of any HTTP framework.
//!
//! Bodies are JSON in, JSON out: `{"code": ".."}` on success, `{"error": ".."}`
//! with a non-2xx status otherwise. `code` is the raw completion; callers
//! normalize it themselves.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::ForgeError;
use crate::prompt::prompts_for;
use crate::provider::Gateway;
use crate::wire::{GenerationRequest, PageVariant, StylePreset};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    #[serde(default, alias = "instruction")]
    pub description: Option<String>,
    #[serde(default)]
    pub page_type: Option<PageVariant>,
    #[serde(default)]
    pub preset: Option<StylePreset>,
    #[serde(default)]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub is_refinement: bool,
    #[serde(default)]
    pub previous_code: Option<String>,
}

impl GenerateBody {
    pub fn into_request(self) -> GenerationRequest {
        let mut req = GenerationRequest::new(self.description.unwrap_or_default(), self.page_type.unwrap_or_default())
            .with_preset(self.preset)
            .with_reference_url(self.reference_url);
        if self.is_refinement {
            req.is_refinement = true;
            req.prior_code = self.previous_code;
        }
        req
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GenerateReply {
    Code {
        code: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        remediation: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: GenerateReply,
}

impl ApiResponse {
    fn ok(code: String) -> Self {
        Self { status: 200, body: GenerateReply::Code { code } }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| r#"{"error":"Generation failed"}"#.to_string())
    }
}

impl From<ForgeError> for ApiResponse {
    fn from(e: ForgeError) -> Self {
        let error = match &e {
            ForgeError::Validation(m) | ForgeError::Upstream(m) => m.clone(),
            ForgeError::Configuration { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            status: e.status(),
            body: GenerateReply::Error { error, remediation: e.remediation().map(str::to_string) },
        }
    }
}

pub async fn handle_generate(gateway: &Gateway, body: GenerateBody, cancel: &CancellationToken) -> ApiResponse {
    let request = body.into_request();
    if let Err(e) = request.validate() {
        return e.into();
    }
    let (system, user) = prompts_for(&request);
    match gateway.complete(&system, &user, cancel).await {
        Ok(code) => ApiResponse::ok(code),
        Err(e) => {
            log::error!("generate: {e}");
            e.into()
        }
    }
}

/// Same as [`handle_generate`] but starting from the raw request body.
pub async fn handle_generate_json(gateway: &Gateway, raw: &str, cancel: &CancellationToken) -> ApiResponse {
    match serde_json::from_str::<GenerateBody>(raw) {
        Ok(body) => handle_generate(gateway, body, cancel).await,
        Err(e) => ForgeError::Validation(format!("invalid request body: {e}")).into(),
    }
}
