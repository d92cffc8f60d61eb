//! Typed API over the durable key-value backend.

use crate::{DurableStorage, StorageKeys, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Entry id -> durable preview string.
pub type PreviewMap = BTreeMap<String, String>;

/// Durable local store for the collection, region and bearer token.
#[derive(Clone)]
pub struct LocalStore {
    storage: Arc<dyn DurableStorage>,
}

impl LocalStore {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn DurableStorage> {
        &self.storage
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, &raw)
    }

    // ==========================================
    // Collection
    // ==========================================

    /// The persisted entry list. Missing key reads as empty; unparseable
    /// contents are an error.
    pub fn entry_list<T: DeserializeOwned>(&self) -> StorageResult<Vec<T>> {
        Ok(self.get_json(StorageKeys::ENTRY_LIST)?.unwrap_or_default())
    }

    pub fn set_entry_list<T: Serialize>(&self, records: &[T]) -> StorageResult<()> {
        self.set_json(StorageKeys::ENTRY_LIST, records)
    }

    /// The auxiliary preview map. Unparseable contents read as empty since
    /// the map only ever supplements the list.
    pub fn preview_map(&self) -> StorageResult<PreviewMap> {
        match self.get_json::<PreviewMap>(StorageKeys::PREVIEW_MAP) {
            Ok(map) => Ok(map.unwrap_or_default()),
            Err(crate::StorageError::Json(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable preview map");
                Ok(PreviewMap::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_preview_map(&self, map: &PreviewMap) -> StorageResult<()> {
        self.set_json(StorageKeys::PREVIEW_MAP, map)
    }

    /// Delete the list and the preview map. Both deletes are attempted; the
    /// first failure is returned.
    pub fn clear_collection(&self) -> StorageResult<()> {
        let list = self.storage.delete(StorageKeys::ENTRY_LIST);
        let previews = self.storage.delete(StorageKeys::PREVIEW_MAP);
        list?;
        previews?;
        Ok(())
    }

    // ==========================================
    // Region
    // ==========================================

    pub fn selected_region(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::SELECTED_REGION)?
            .filter(|region| !region.trim().is_empty()))
    }

    pub fn set_selected_region(&self, region: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::SELECTED_REGION, region)
    }

    // ==========================================
    // Bearer token
    // ==========================================

    pub fn bearer_token(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::BEARER_TOKEN)?
            .filter(|token| !token.is_empty()))
    }

    pub fn set_bearer_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::BEARER_TOKEN, token)
    }

    pub fn clear_bearer_token(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::BEARER_TOKEN)
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStorage, StorageError};
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    fn store() -> (Arc<MemoryStorage>, LocalStore) {
        let memory = Arc::new(MemoryStorage::new());
        let store = LocalStore::new(memory.clone());
        (memory, store)
    }

    #[test]
    fn test_entry_list_roundtrip_and_missing_key() {
        let (_, store) = store();
        assert!(store.entry_list::<Item>().unwrap().is_empty());

        let items = vec![Item { id: "a".into() }, Item { id: "b".into() }];
        store.set_entry_list(&items).unwrap();
        assert_eq!(store.entry_list::<Item>().unwrap(), items);
    }

    #[test]
    fn test_corrupt_entry_list_is_an_error() {
        let (memory, store) = store();
        memory.set(StorageKeys::ENTRY_LIST, "[{").unwrap();
        assert!(matches!(store.entry_list::<Item>(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_corrupt_preview_map_reads_empty() {
        let (memory, store) = store();
        memory.set(StorageKeys::PREVIEW_MAP, "oops").unwrap();
        assert!(store.preview_map().unwrap().is_empty());
    }

    #[test]
    fn test_clear_collection_keeps_token_and_region() {
        let (memory, store) = store();
        store.set_entry_list(&[Item { id: "a".into() }]).unwrap();
        let mut map = PreviewMap::new();
        map.insert("a".into(), "data:image/png;base64,AA==".into());
        store.set_preview_map(&map).unwrap();
        store.set_bearer_token("tok").unwrap();
        store.set_selected_region("Ohio").unwrap();

        store.clear_collection().unwrap();

        assert_eq!(memory.keys(), vec!["access_token", "selectedRegion"]);
    }

    #[test]
    fn test_bearer_token_lifecycle() {
        let (_, store) = store();
        assert_eq!(store.bearer_token().unwrap(), None);
        store.set_bearer_token("tok").unwrap();
        assert_eq!(store.bearer_token().unwrap(), Some("tok".to_string()));
        assert!(store.clear_bearer_token().unwrap());
        assert_eq!(store.bearer_token().unwrap(), None);
    }

    #[test]
    fn test_blank_region_reads_as_none() {
        let (_, store) = store();
        store.set_selected_region("  ").unwrap();
        assert_eq!(store.selected_region().unwrap(), None);
    }
}
