//! Typed errors for the merge service client and the session state.

use thiserror::Error;

/// Failure of a request against the merge service.
///
/// Carries strings rather than the underlying `reqwest::Error` so results can be compared
/// in tests and moved across the controller channel without ceremony.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unexpected response from server: {0}")]
    Malformed(String),
    #[error("{0}")]
    Rejected(String),
    #[error("server started a different session ({got}); clear the list and upload again")]
    SessionMismatch { expected: String, got: String },
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Malformed(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e.to_string())
    }
}

/// Local precondition failures; these never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Please add at least one PDF before merging")]
    NoFiles,
    #[error("No session is active; upload files first")]
    NoSession,
    #[error("Nothing to download yet; merge the files first")]
    NoMergeResult,
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}
