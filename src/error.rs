use thiserror::Error;

#[derive(Debug, Error)]
pub enum BioPortalError {
    #[error(
        "BioPortal API key is required. Pass --api-key or set the {env_var} environment variable."
    )]
    MissingApiKey { env_var: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("Invalid JSON from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),
}

impl BioPortalError {
    /// Configuration errors are the only failures surfaced to callers of the
    /// public operations; everything else degrades to an empty result.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingApiKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_key_is_a_configuration_error() {
        let missing = BioPortalError::MissingApiKey {
            env_var: "BIOPORTAL_API_KEY".into(),
        };
        assert!(missing.is_configuration());
        assert!(missing.to_string().contains("BIOPORTAL_API_KEY"));

        let api = BioPortalError::Api {
            api: "bioportal".into(),
            message: "HTTP 500".into(),
        };
        assert!(!api.is_configuration());
        assert!(!BioPortalError::InvalidArgument("empty".into()).is_configuration());
    }
}
