//! Durable local storage for the plant collection.
//!
//! This crate provides the fallback store used when no backend session is
//! active:
//! - [`DurableStorage`]: the key-value backend seam
//! - [`MemoryStorage`]: in-process backend with an optional total quota
//!   and per-write limit
//! - [`FileStorage`]: JSON file backend with atomic replace and a byte quota
//! - [`LocalStore`]: typed accessors over the [`StorageKeys`]

mod file;
mod keys;
mod local_store;
mod memory;
mod traits;

pub use file::{FileStorage, DEFAULT_FILE_QUOTA_BYTES};
pub use keys::StorageKeys;
pub use local_store::{LocalStore, PreviewMap};
pub use memory::MemoryStorage;
pub use traits::DurableStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Write rejected because the backend is out of capacity
    #[error("Storage quota exceeded writing {key}: {attempted_bytes} bytes over limit {limit}")]
    QuotaExceeded {
        key: String,
        attempted_bytes: usize,
        limit: usize,
    },

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Stored JSON could not be parsed or produced
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Bytes a key/value pair counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys_unique() {
        let keys = [
            StorageKeys::ENTRY_LIST,
            StorageKeys::PREVIEW_MAP,
            StorageKeys::SELECTED_REGION,
            StorageKeys::BEARER_TOKEN,
        ];
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "Storage keys must be unique");
    }

    #[test]
    fn test_quota_error_classification() {
        let err = StorageError::QuotaExceeded {
            key: "k".into(),
            attempted_bytes: 10,
            limit: 5,
        };
        assert!(err.is_quota_exceeded());
        assert!(!StorageError::Encoding("bad".into()).is_quota_exceeded());
    }
}
