//! JSON file storage backend.

use crate::{entry_size, DurableStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Capacity of a file store unless configured otherwise (5 MiB).
pub const DEFAULT_FILE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Key-value storage persisted as a single JSON object on disk.
///
/// Every write replaces the file through a temporary sibling and a rename,
/// so a crash leaves either the old or the new contents.
pub struct FileStorage {
    path: PathBuf,
    quota_bytes: usize,
    cache: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create on first write) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::open_with_quota(path, DEFAULT_FILE_QUOTA_BYTES)
    }

    pub fn open_with_quota(path: impl Into<PathBuf>, quota_bytes: usize) -> StorageResult<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = cache.len(), "Opened file storage");

        Ok(Self {
            path,
            quota_bytes,
            cache: Mutex::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to replace storage file");
            StorageError::Io(e)
        })
    }
}

impl DurableStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut cache = self.cache.lock();
        let others: usize = cache
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        let attempted_bytes = others + entry_size(key, value);
        if attempted_bytes > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                attempted_bytes,
                limit: self.quota_bytes,
            });
        }

        let mut next = cache.clone();
        next.insert(key.to_string(), value.to_string());
        self.write_file(&next)?;
        *cache = next;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.cache.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut cache = self.cache.lock();
        if !cache.contains_key(key) {
            return Ok(false);
        }
        let mut next = cache.clone();
        next.remove(key);
        self.write_file(&next)?;
        *cache = next;
        Ok(true)
    }

    fn used_bytes(&self) -> Option<usize> {
        Some(self.cache.lock().iter().map(|(k, v)| entry_size(k, v)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store").join("local-storage.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("selectedRegion", "Texas").unwrap();
        storage.set("access_token", "tok").unwrap();
        assert!(storage.delete("access_token").unwrap());
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("selectedRegion").unwrap(), Some("Texas".to_string()));
        assert_eq!(reopened.get("access_token").unwrap(), None);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_quota_exceeded_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local-storage.json");

        let storage = FileStorage::open_with_quota(&path, 32).unwrap();
        storage.set("a", "small").unwrap();
        let err = storage.set("b", &"x".repeat(64)).unwrap_err();
        assert!(err.is_quota_exceeded());

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), Some("small".to_string()));
        assert_eq!(reopened.get("b").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("local-storage.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileStorage::open(&path), Err(StorageError::Json(_))));
    }
}
