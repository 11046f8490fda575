//! Error types for the client.

use thiserror::Error;

use crate::types::RunStatus;

/// Client error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed (after retries).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error type reported by the API (e.g. `record-not-found`), if any.
        error_type: Option<String>,
        /// Error message from the API, or the raw body.
        message: String,
    },

    /// A run disappeared while it was being waited on.
    #[error("Run {run_id} not found while waiting for it to finish")]
    RunNotFound {
        /// Identifier of the run.
        run_id: String,
    },

    /// A run finished unsuccessfully and the caller asked for that to be an error.
    #[error("Run {run_id} finished with status {status}")]
    RunFailed {
        /// Identifier of the run.
        run_id: String,
        /// Terminal status reported by the API.
        status: RunStatus,
    },

    /// The request could not be built from the given options.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
