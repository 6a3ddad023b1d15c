//! Credential resolution for outbound BioPortal calls.

use std::borrow::Cow;

use crate::error::BioPortalError;

pub const API_KEY_ENV: &str = "BIOPORTAL_API_KEY";

/// Resolves the API key for a single operation call.
///
/// An explicit key always wins; otherwise the named environment variable is
/// read. Nothing is cached, so each call may carry a different key.
#[derive(Debug, Clone)]
pub struct ApiKeyResolver {
    env_var: Cow<'static, str>,
}

impl Default for ApiKeyResolver {
    fn default() -> Self {
        Self {
            env_var: Cow::Borrowed(API_KEY_ENV),
        }
    }
}

impl ApiKeyResolver {
    pub fn with_env_var(env_var: impl Into<Cow<'static, str>>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    pub fn env_var(&self) -> &str {
        self.env_var.as_ref()
    }

    pub fn resolve(&self, explicit: Option<&str>) -> Result<String, BioPortalError> {
        resolve_with(explicit, self.env_var(), |name| std::env::var(name).ok())
    }
}

pub(crate) fn resolve_with<F>(
    explicit: Option<&str>,
    env_var: &str,
    lookup: F,
) -> Result<String, BioPortalError>
where
    F: FnOnce(&str) -> Option<String>,
{
    if let Some(key) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(key.to_string());
    }

    lookup(env_var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BioPortalError::MissingApiKey {
            env_var: env_var.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins_over_environment() {
        let key = resolve_with(Some("explicit"), API_KEY_ENV, |_| Some("from-env".into())).unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn blank_explicit_key_falls_back_to_environment() {
        let key = resolve_with(Some("   "), API_KEY_ENV, |name| {
            assert_eq!(name, API_KEY_ENV);
            Some("from-env".into())
        })
        .unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = resolve_with(None, "SOME_KEY_VAR", |_| None).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            BioPortalError::MissingApiKey { ref env_var } if env_var == "SOME_KEY_VAR"
        ));

        let err = resolve_with(None, "SOME_KEY_VAR", |_| Some(String::new())).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn resolver_reads_its_configured_variable() {
        let resolver = ApiKeyResolver::with_env_var("BIOPORTAL_CLI_TEST_NEVER_SET_7f3a");
        assert_eq!(resolver.env_var(), "BIOPORTAL_CLI_TEST_NEVER_SET_7f3a");
        assert!(resolver.resolve(None).unwrap_err().is_configuration());
        assert_eq!(resolver.resolve(Some("k")).unwrap(), "k");
    }
}
