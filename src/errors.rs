use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForgeError {
    #[error("validation error: {0}")] Validation(String),
    #[error("configuration error: {message}")] Configuration { message: String, remediation: String },
    #[error("upstream error: {0}")] Upstream(String),
    #[error("preview render error: {0}")] PreviewRender(String),
    #[error("storage error: {0}")] Storage(String),
}

impl ForgeError {
    pub fn missing_credential(var: &str) -> Self {
        ForgeError::Configuration {
            message: format!("{var} not configured"),
            remediation: format!("export {var}=<your key> (or set `api_key_env` in shopforge.toml) and retry"),
        }
    }

    /// Guidance shown next to the message; only configuration problems carry one.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            ForgeError::Configuration { remediation, .. } => Some(remediation),
            _ => None,
        }
    }

    /// HTTP-class status used by the generation endpoint.
    pub fn status(&self) -> u16 {
        match self {
            ForgeError::Validation(_) => 400,
            ForgeError::Configuration { .. } => 500,
            ForgeError::Upstream(_) => 502,
            ForgeError::PreviewRender(_) | ForgeError::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_carry_remediation() {
        let cfg = ForgeError::missing_credential("OPENROUTER_API_KEY");
        assert!(cfg.remediation().unwrap().contains("OPENROUTER_API_KEY"));
        assert_eq!(cfg.to_string(), "configuration error: OPENROUTER_API_KEY not configured");
        assert!(ForgeError::Upstream("boom".into()).remediation().is_none());
    }

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(ForgeError::Validation("x".into()).status(), 400);
        assert_eq!(ForgeError::missing_credential("K").status(), 500);
        assert_eq!(ForgeError::Upstream("x".into()).status(), 502);
    }
}
