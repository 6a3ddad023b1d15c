//! Public operations: resolve the key, fetch, normalize, cap.
//!
//! Only a missing API key escapes these functions as an error. Any other
//! failure is reported to the client's diagnostic sink and turned into an
//! empty result.

use crate::diagnostics::Diagnostic;
use crate::error::BioPortalError;
use crate::sources::bioportal::BioPortalClient;

pub mod analytics;
pub mod annotation;
pub mod property;
pub mod term;

pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Splits a comma-separated filter such as `"NCIT, GO,,HP"`.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn required_text<'a>(value: &'a str, what: &str) -> Result<&'a str, BioPortalError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BioPortalError::InvalidArgument(format!("{what} is required")));
    }
    Ok(value)
}

pub(crate) fn degrade<T: Default>(
    client: &BioPortalClient,
    operation: &'static str,
    result: Result<T, BioPortalError>,
) -> Result<T, BioPortalError> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_configuration() => Err(err),
        Err(err) => {
            client.diagnostics().record(Diagnostic::OperationFailed {
                operation,
                message: err.to_string(),
            });
            Ok(T::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empty_entries() {
        assert_eq!(split_csv("NCIT, GO,,HP "), vec!["NCIT", "GO", "HP"]);
        assert!(split_csv(" , ").is_empty());
    }

    #[test]
    fn required_text_rejects_blank_values() {
        assert_eq!(required_text("  melanoma ", "Query").unwrap(), "melanoma");
        let err = required_text("   ", "Query").unwrap_err();
        assert!(matches!(err, BioPortalError::InvalidArgument(ref m) if m == "Query is required"));
    }
}
