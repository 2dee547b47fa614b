use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ForgeError;
use crate::normalize::normalize;

// ========================================
// Generation data model
// ========================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageVariant {
    #[default]
    Landing,
    Product,
}

impl PageVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            PageVariant::Landing => "landing",
            PageVariant::Product => "product",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PageVariant::Landing => "Landing Page",
            PageVariant::Product => "Product Page",
        }
    }
}

impl fmt::Display for PageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePreset {
    Minimalist,
    Bold,
    Luxury,
    Playful,
}

impl StylePreset {
    pub fn label(self) -> &'static str {
        match self {
            StylePreset::Minimalist => "Minimalist",
            StylePreset::Bold => "Bold",
            StylePreset::Luxury => "Luxury",
            StylePreset::Playful => "Playful",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl DeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub instruction_text: String,
    pub page_variant: PageVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<StylePreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub is_refinement: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_code: Option<String>,
}

impl GenerationRequest {
    pub fn new(instruction_text: impl Into<String>, page_variant: PageVariant) -> Self {
        Self {
            instruction_text: instruction_text.into(),
            page_variant,
            style_preset: None,
            reference_url: None,
            is_refinement: false,
            prior_code: None,
        }
    }

    pub fn with_preset(mut self, preset: Option<StylePreset>) -> Self {
        self.style_preset = preset;
        self
    }

    /// Blank URLs are treated as absent.
    pub fn with_reference_url(mut self, url: Option<String>) -> Self {
        self.reference_url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        self
    }

    pub fn refining(mut self, prior_code: impl Into<String>) -> Self {
        self.is_refinement = true;
        self.prior_code = Some(prior_code.into());
        self
    }

    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.instruction_text.trim().is_empty() {
            return Err(ForgeError::Validation("Description is required".into()));
        }
        if self.is_refinement && self.prior_code.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(ForgeError::Validation("refinement requires previous code".into()));
        }
        Ok(())
    }
}

/// Raw model output plus its normalized form; never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    source_text: String,
    normalized_source_text: String,
}

impl GenerationResult {
    pub fn from_raw(source_text: impl Into<String>) -> Self {
        let source_text = source_text.into();
        let normalized_source_text = normalize(&source_text);
        Self { source_text, normalized_source_text }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn normalized_source_text(&self) -> &str {
        &self.normalized_source_text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPageRecord {
    pub id: String,
    #[serde(rename = "pageType")]
    pub page_variant: PageVariant,
    #[serde(rename = "prompt")]
    pub instruction_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(rename = "code")]
    pub source_text: String,
    #[serde(default, rename = "preset", skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<StylePreset>,
    #[serde(rename = "createdAt")]
    pub created_at_epoch_millis: i64,
}

impl SavedPageRecord {
    pub fn new(request: &GenerationRequest, result: &GenerationResult, created_at_epoch_millis: i64) -> Self {
        Self {
            id: format!("page-{}", uuid::Uuid::new_v4().simple()),
            page_variant: request.page_variant,
            instruction_text: request.instruction_text.trim().to_string(),
            reference_url: request.reference_url.clone(),
            source_text: result.source_text().to_string(),
            style_preset: request.style_preset,
            created_at_epoch_millis,
        }
    }
}

/// Fields carried from a saved record back into the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffPayload {
    pub code: String,
    pub page_type: PageVariant,
    pub prompt: String,
}

impl From<&SavedPageRecord> for HandoffPayload {
    fn from(r: &SavedPageRecord) -> Self {
        Self {
            code: r.source_text.clone(),
            page_type: r.page_variant,
            prompt: r.instruction_text.clone(),
        }
    }
}
