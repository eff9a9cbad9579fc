//! Error types for JAMS API calls.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::JobId;

/// Result type alias for JAMS API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the JAMS server.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("username or password not specified")]
    Credentials,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("received an invalid response from {url}: {status}")]
    Status { status: StatusCode, url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no history found for job {0}")]
    NoHistory(JobId),

    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// HTTP status returned by the server, if the call got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}
