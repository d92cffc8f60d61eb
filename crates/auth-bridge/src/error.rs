//! Authentication error types.

use crate::PopupError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Backend rejected or could not verify the external identity token
    #[error("Backend session exchange failed: {0}")]
    ExchangeFailed(String),

    /// Stored bearer token is no longer accepted (401)
    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    /// Inline sign-in failed in a way that has no redirect fallback
    #[error("Popup sign-in failed: {0}")]
    Popup(#[from] PopupError),

    /// Identity provider call failed
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Backend returned an unexpected status
    #[error("Backend error: HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] plant_local_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] plant_config_and_utils::CoreError),
}

impl AuthError {
    /// Returns true for fetch-level failures (connection, timeout, 5xx).
    pub fn is_network_failure(&self) -> bool {
        match self {
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            AuthError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
