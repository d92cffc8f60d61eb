//! Storage trait definitions.

use crate::StorageResult;

/// Trait for durable key-value backends.
///
/// Writes may fail with [`crate::StorageError::QuotaExceeded`] when the backend
/// has a capacity limit.
pub trait DurableStorage: Send + Sync {
    /// Store a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value. Returns whether the key existed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Bytes currently in use, when the backend tracks it.
    fn used_bytes(&self) -> Option<usize> {
        None
    }
}
