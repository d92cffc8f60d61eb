//! Remote store error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    /// Bearer token missing or rejected (401)
    #[error("Not authorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status other than 401/404
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Endpoint answered 2xx with `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] plant_config_and_utils::CoreError),
}

impl RemoteError {
    /// Fetch-level failure (connection, timeout, 5xx).
    pub fn is_network_failure(&self) -> bool {
        match self {
            RemoteError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            RemoteError::Timeout(_) => true,
            RemoteError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
