//! Error types for the Scalingo provider.

use std::error::Error as _;

use thiserror::Error;

use crate::api::ApiError;
use crate::schema::Diagnostic;
use crate::state::StateError;

/// Errors returned by provider operations.
///
/// Every variant names the step that failed; the underlying cause is kept
/// as the error source so it can be surfaced in diagnostics.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation not implemented for this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// An import identifier did not have the `<app>:<id>` shape.
    #[error("address should have the following format: <appid>:<collaborator ID>, got '{0}'")]
    InvalidImportId(String),

    /// A date filter could not be parsed.
    #[error("fail to parse {field}: {source}")]
    DateParse {
        /// The attribute holding the date.
        field: &'static str,
        /// The underlying parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// A call to the Scalingo API failed.
    #[error("fail to {action}: {source}")]
    Api {
        /// What was being attempted (e.g. `list invoices`).
        action: &'static str,
        /// The underlying API error.
        #[source]
        source: ApiError,
    },

    /// Writing into the host state failed.
    #[error("fail to store {what}: {source}")]
    Store {
        /// What was being stored.
        what: &'static str,
        /// Why the state rejected it.
        #[source]
        source: StateError,
    },
}

impl ProviderError {
    /// Wrap an API error with the action that triggered it.
    pub fn api(action: &'static str, source: ApiError) -> Self {
        Self::Api { action, source }
    }

    /// Wrap a state write error with what was being stored.
    pub fn store(what: &'static str, source: StateError) -> Self {
        Self::Store { what, source }
    }

    /// Whether this error means the remote object is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Api {
                    source: ApiError::NotFound { .. },
                    ..
                }
        )
    }

    /// Render this error as host diagnostics.
    ///
    /// The summary is the top-level message; the detail lists the chain of
    /// underlying causes, if any.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        let mut causes = Vec::new();
        let mut source = self.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }

        let mut diagnostic = Diagnostic::error(self.to_string());
        if !causes.is_empty() {
            diagnostic = diagnostic.with_detail(causes.join(": "));
        }
        if let Self::DateParse { field, .. } = self {
            diagnostic = diagnostic.with_attribute(*field);
        }
        vec![diagnostic]
    }
}

/// Result alias for provider operations.
pub type Result<T> = core::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("collaborator".to_string());
        assert_eq!(format!("{}", err), "Resource not found: collaborator");

        let err = ProviderError::UnknownResource("scalingo_app".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: scalingo_app");

        let err = ProviderError::InvalidImportId("bad-format".to_string());
        assert_eq!(
            format!("{}", err),
            "address should have the following format: <appid>:<collaborator ID>, got 'bad-format'"
        );
    }

    #[test]
    fn test_api_error_names_the_step() {
        let err = ProviderError::api("list invoices", ApiError::api(500, "internal error"));
        assert_eq!(
            err.to_string(),
            "fail to list invoices: Scalingo API error (500): internal error"
        );
        assert!(!err.is_not_found());

        let err = ProviderError::api(
            "list collaborators",
            ApiError::NotFound {
                resource: "app my-app".to_string(),
            },
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_date_parse_diagnostics() {
        let source = chrono::NaiveDate::parse_from_str("2023-13-01", "%Y-%m-%d").unwrap_err();
        let err = ProviderError::DateParse {
            field: "before",
            source,
        };

        let diagnostics = err.to_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
        assert!(diagnostics[0].summary.starts_with("fail to parse before:"));
        assert!(diagnostics[0].detail.is_some());
        assert_eq!(diagnostics[0].attribute, Some("before".to_string()));
    }

    #[test]
    fn test_store_error_names_the_step() {
        let err = ProviderError::store(
            "collaborator information",
            StateError::UnknownAttribute("role".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "fail to store collaborator information: unknown attribute 'role'"
        );
    }

    #[test]
    fn test_diagnostics_without_source() {
        let err = ProviderError::Validation("invalid input".to_string());
        let diagnostics = err.to_diagnostics();
        assert_eq!(diagnostics[0].summary, "Validation error: invalid input");
        assert!(diagnostics[0].detail.is_none());
    }
}
