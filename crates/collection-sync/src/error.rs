//! Collection sync error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Entry already left `Analyzing`
    #[error("Entry {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("Entry not found: {0}")]
    NotFound(String),

    /// No entry is waiting for a result
    #[error("No entry is awaiting analysis")]
    NothingAnalyzing,

    /// Image rejected before any entry was created
    #[error("Image rejected: {0}")]
    Validation(String),

    #[error("Analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Storage error: {0}")]
    Storage(#[from] plant_local_storage::StorageError),

    #[error("Remote store error: {0}")]
    Remote(#[from] remote_collection_client::RemoteError),
}

pub type SyncResult<T> = Result<T, SyncError>;
