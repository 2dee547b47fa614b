use anyhow::Result;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::apply::write_atomic;
use crate::errors::ForgeError;
use crate::prompt::{is_refinement, prompts_for};
use crate::provider::Gateway;
use crate::wire::{GenerationRequest, GenerationResult, HandoffPayload};

pub const SESSION_FILE: &str = "session.json";

/// How `submit` decides between refining and starting over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefineMode {
    /// Verb-prefix heuristic, only when a previous result exists.
    #[default]
    Auto,
    Refine,
    Fresh,
}

/// What the generator remembers between submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub last_request: Option<GenerationRequest>,
    #[serde(default)]
    pub last_result: Option<GenerationResult>,
}

impl SessionState {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SESSION_FILE)
    }

    /// Missing or unreadable state starts a fresh session.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("session: ignoring unreadable {}: {e}", path.display());
            Self::default()
        }))
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        write_atomic(&Self::path(data_dir), &serde_json::to_vec_pretty(self)?)
    }

    pub fn prior_code(&self) -> Option<&str> {
        self.last_result.as_ref().map(GenerationResult::source_text).filter(|c| !c.trim().is_empty())
    }

    /// Replaces the session with a saved page picked elsewhere.
    pub fn seed(&mut self, payload: HandoffPayload) {
        log::info!("session: loaded saved {} page", payload.page_type);
        self.last_request = Some(GenerationRequest::new(payload.prompt, payload.page_type));
        self.last_result = Some(GenerationResult::from_raw(payload.code));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub request: GenerationRequest,
    pub result: GenerationResult,
    pub previous: Option<GenerationResult>,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl Outcome {
    pub fn is_refinement(&self) -> bool {
        self.request.is_refinement
    }
}

pub struct Generator {
    gateway: Gateway,
    state: SessionState,
}

impl Generator {
    pub fn new(gateway: Gateway, state: SessionState) -> Self {
        Self { gateway, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    fn classify(&self, request: GenerationRequest, mode: RefineMode) -> GenerationRequest {
        let prior = self.state.prior_code();
        let refine = match mode {
            RefineMode::Fresh => false,
            RefineMode::Refine => true,
            RefineMode::Auto => is_refinement(&request.instruction_text, prior),
        };
        let mut request = GenerationRequest { is_refinement: false, prior_code: None, ..request };
        if refine {
            request.is_refinement = true;
            request.prior_code = prior.map(str::to_string);
        }
        request
    }

    /// One full round: classify, prompt, complete, normalize, remember.
    pub async fn submit(
        &mut self,
        request: GenerationRequest,
        mode: RefineMode,
        cancel: &CancellationToken,
    ) -> Result<Outcome, ForgeError> {
        let request = self.classify(request, mode);
        request.validate()?;
        log::info!(
            "session: {} {} page via {}",
            if request.is_refinement { "refining" } else { "generating" },
            request.page_variant,
            self.gateway.provider_name()
        );

        let (system_prompt, user_prompt) = prompts_for(&request);
        let raw = self.gateway.complete(&system_prompt, &user_prompt, cancel).await?;
        if raw.trim().is_empty() {
            return Err(ForgeError::Upstream("model returned an empty completion".into()));
        }

        let result = GenerationResult::from_raw(raw);
        let previous = self.state.last_result.replace(result.clone());
        self.state.last_request = Some(request.clone());
        Ok(Outcome { request, result, previous, system_prompt, user_prompt })
    }
}
