//! Error types for Scalingo API calls.

use thiserror::Error;

/// Errors returned by a [`ScalingoApi`](super::ScalingoApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API token was rejected by the authentication service.
    #[error("unauthorized: the API token was rejected")]
    Unauthorized,

    /// The targeted entity does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// What was being looked up (e.g. `app my-app`).
        resource: String,
    },

    /// The API answered with a non-success status.
    #[error("Scalingo API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Build an [`ApiError::Api`] from a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Url(_) => None,
        }
    }
}
