//! In-process storage backend.

use crate::{entry_size, DurableStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Key-value storage held in memory, with an optional total byte quota
/// and an optional per-write size limit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    write_limit_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes which would push the total size (keys
    /// plus values) over `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Storage that rejects any single write whose key plus value exceeds
    /// `limit_bytes`, regardless of what else is stored.
    pub fn with_write_limit(limit_bytes: usize) -> Self {
        Self {
            write_limit_bytes: Some(limit_bytes),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl DurableStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(limit) = self.write_limit_bytes {
            let attempted_bytes = entry_size(key, value);
            if attempted_bytes > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    attempted_bytes,
                    limit,
                });
            }
        }

        let mut data = self.data.lock();
        if let Some(limit) = self.quota_bytes {
            let others: usize = data
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| entry_size(k, v))
                .sum();
            let attempted_bytes = others + entry_size(key, value);
            if attempted_bytes > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    attempted_bytes,
                    limit,
                });
            }
        }
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.data.lock().remove(key).is_some())
    }

    fn used_bytes(&self) -> Option<usize> {
        Some(self.data.lock().iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_quota_rejects_oversized_write_and_keeps_old_value() {
        let storage = MemoryStorage::with_quota(20);
        storage.set("a", "12345").unwrap();

        let err = storage.set("a", &"x".repeat(50)).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(storage.get("a").unwrap(), Some("12345".to_string()));
    }

    #[test]
    fn test_quota_counts_replacement_not_sum() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "123456789").unwrap();
        // Replacing the same key frees its previous bytes.
        storage.set("k", "987654321").unwrap();
        assert_eq!(storage.used_bytes(), Some(10));

        assert!(storage.set("j", "1").unwrap_err().is_quota_exceeded());
    }

    #[test]
    fn test_write_limit_is_per_payload() {
        let storage = MemoryStorage::with_write_limit(10);
        storage.set("a", "123456789").unwrap();
        storage.set("b", "123456789").unwrap();
        assert!(storage.set("c", "1234567890").unwrap_err().is_quota_exceeded());
        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
