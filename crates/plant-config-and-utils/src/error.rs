//! Errors from loading settings and resolving app directories.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The backend URL parsed but cannot be used in this deployment.
    #[error("Unusable backend URL: {0}")]
    BackendUrl(String),

    #[error("Backend URL does not parse: {0}")]
    MalformedBackendUrl(#[from] url::ParseError),

    #[error("Config file is not valid JSON: {0}")]
    ConfigFile(#[from] serde_json::Error),

    #[error("Failed to read or write under the app directory: {0}")]
    Io(#[from] std::io::Error),

    /// `~/.plant-imager` needs a home directory.
    #[error("No home directory to hold the app directory")]
    NoHomeDirectory,
}

pub type CoreResult<T> = Result<T, CoreError>;
