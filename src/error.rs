// src/error.rs
use thiserror::Error;

/// Failures talking to the queue server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("queue server rejected the auth token (401)")]
    Unauthorized,

    #[error("queue server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to queue server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse queue server response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no auth token available")]
    MissingToken,

    #[error(transparent)]
    Api(#[from] ApiError),
}
