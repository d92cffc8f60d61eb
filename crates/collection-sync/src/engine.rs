//! The collection sync engine.
//!
//! Every operation re-reads the current [`AuthSession`] and picks exactly one
//! authoritative store for that operation: the remote store when the session
//! is fully authenticated, the local store otherwise. The two are never
//! merged.

use crate::events::EVENT_CHANNEL_CAPACITY;
use crate::persist::persist_local;
use crate::{
    Clock, CollectionEntry, CollectionEvent, EntryId, EntryOutcome, EntryStatus, PersistOutcome,
    SyncError, SyncResult, SystemClock,
};
use auth_bridge::{AuthSession, BearerToken};
use futures_util::future::join_all;
use image_preview::{CapturedImage, ImagePreviewManager, PreviewTarget};
use parking_lot::Mutex;
use plant_config_and_utils::{Config, DEFAULT_MAX_COLLECTION_ENTRIES};
use plant_local_storage::LocalStore;
use remote_collection_client::{decode_records, CollectionItemRecord, RemoteCollectionStore};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Which entry `complete` applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionTarget {
    Id(EntryId),
    /// The earliest-created entry still analyzing.
    Latest,
}

/// Store selected for one operation.
#[derive(Debug, Clone)]
enum Authority {
    Remote(BearerToken),
    Local,
}

pub struct EngineOptions {
    pub clock: Arc<dyn Clock>,
    pub max_entries: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            max_entries: DEFAULT_MAX_COLLECTION_ENTRIES,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_entries: config.max_collection_entries.max(1),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

struct EngineInner {
    remote: Arc<dyn RemoteCollectionStore>,
    local: LocalStore,
    previews: ImagePreviewManager,
    session: watch::Receiver<AuthSession>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
    /// Newest first.
    entries: Mutex<Vec<CollectionEntry>>,
    /// Completed entries whose remote push failed.
    unsynced: Mutex<BTreeSet<EntryId>>,
    events: broadcast::Sender<CollectionEvent>,
    /// Tail of the background write chain.
    last_write: Mutex<Option<JoinHandle<()>>>,
}

/// Source of truth for the ordered collection.
#[derive(Clone)]
pub struct CollectionSyncEngine {
    inner: Arc<EngineInner>,
}

impl CollectionSyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteCollectionStore>,
        local: LocalStore,
        previews: ImagePreviewManager,
        session: watch::Receiver<AuthSession>,
    ) -> Self {
        Self::with_options(remote, local, previews, session, EngineOptions::default())
    }

    pub fn with_options(
        remote: Arc<dyn RemoteCollectionStore>,
        local: LocalStore,
        previews: ImagePreviewManager,
        session: watch::Receiver<AuthSession>,
        options: EngineOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                remote,
                local,
                previews,
                session,
                clock: options.clock,
                max_entries: options.max_entries.max(1),
                entries: Mutex::new(Vec::new()),
                unsynced: Mutex::new(BTreeSet::new()),
                events,
                last_write: Mutex::new(None),
            }),
        }
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn entries(&self) -> Vec<CollectionEntry> {
        self.inner.entries.lock().clone()
    }

    pub fn entry(&self, id: &EntryId) -> Option<CollectionEntry> {
        self.inner
            .entries
            .lock()
            .iter()
            .find(|entry| entry.id() == id)
            .cloned()
    }

    pub fn previews(&self) -> &ImagePreviewManager {
        &self.inner.previews
    }

    /// True when the remote store is authoritative right now.
    pub fn is_remote_authoritative(&self) -> bool {
        matches!(self.authority(), Authority::Remote(_))
    }

    /// Completed entries whose remote push has not succeeded yet.
    pub fn unsynced(&self) -> Vec<EntryId> {
        self.inner.unsynced.lock().iter().cloned().collect()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CollectionEvent> {
        self.inner.events.subscribe()
    }

    pub fn remember_region(&self, region: &str) -> SyncResult<()> {
        self.inner.local.set_selected_region(region)?;
        Ok(())
    }

    pub fn last_region(&self) -> Option<String> {
        self.inner.local.selected_region().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read selected region");
            None
        })
    }

    // ==========================================
    // Load
    // ==========================================

    /// Replace the in-memory list from the authoritative store.
    ///
    /// A failed remote list falls back to the local list. Only a failure to
    /// read the local list is returned.
    pub async fn load(&self) -> SyncResult<usize> {
        let entries = match self.authority() {
            Authority::Remote(token) => match self.inner.remote.list(token.as_str()).await {
                Ok(records) => self.hydrate_remote(&token, records).await,
                Err(e) => {
                    warn!(error = %e, "Remote collection unavailable, loading local list");
                    self.read_local()?
                }
            },
            Authority::Local => self.read_local()?,
        };

        let count = entries.len();
        self.replace_entries(entries);
        info!(entries = count, "Collection loaded");
        Ok(count)
    }

    async fn hydrate_remote(
        &self,
        token: &BearerToken,
        mut records: Vec<CollectionItemRecord>,
    ) -> Vec<CollectionEntry> {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(self.inner.max_entries);

        let remote = &self.inner.remote;
        let fetches = records.into_iter().map(|record| async move {
            let image = match remote.fetch_image(token.as_str(), &record.id).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(entry_id = %record.id, error = %e, "Failed to fetch entry image");
                    None
                }
            };
            (record, image)
        });

        join_all(fetches)
            .await
            .into_iter()
            .map(|(record, image)| {
                let preview = image.map(|image| self.inner.previews.attach_remote_binary(image));
                CollectionEntry::from_record(record, preview)
            })
            .collect()
    }

    fn read_local(&self) -> SyncResult<Vec<CollectionEntry>> {
        let values: Vec<serde_json::Value> = self.inner.local.entry_list()?;
        let records = decode_records(values);
        let map = self.inner.local.preview_map().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read preview map");
            Default::default()
        });
        let previews = &self.inner.previews;

        Ok(records
            .into_iter()
            .take(self.inner.max_entries)
            .map(|record| {
                let preview = record
                    .preview
                    .as_deref()
                    .and_then(|raw| previews.restore_durable(raw))
                    .or_else(|| {
                        map.get(&record.id)
                            .and_then(|raw| previews.restore_durable(raw))
                    });
                CollectionEntry::from_record(record, preview)
            })
            .collect())
    }

    fn replace_entries(&self, entries: Vec<CollectionEntry>) {
        let previous = std::mem::replace(&mut *self.inner.entries.lock(), entries);
        self.release_all(previous);
        let ids: BTreeSet<EntryId> = self
            .inner
            .entries
            .lock()
            .iter()
            .map(|entry| entry.id().clone())
            .collect();
        self.inner.unsynced.lock().retain(|id| ids.contains(id));
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Add a new `Analyzing` entry at the head of the list.
    ///
    /// A blank region falls back to the last selected one. Without a backend
    /// session the list is persisted locally before returning; with one the
    /// image and record are written in the background.
    pub async fn append(&self, image: CapturedImage, region: &str) -> EntryId {
        let region = match region.trim() {
            "" => self.last_region().unwrap_or_default(),
            region => region.to_string(),
        };
        let authority = self.authority();
        let target = match authority {
            Authority::Remote(_) => PreviewTarget::Remote,
            Authority::Local => PreviewTarget::Local,
        };

        let id = EntryId::generate();
        let preview = self.inner.previews.attach_for_capture(&image, target);
        let entry = CollectionEntry::analyzing(
            id.clone(),
            self.inner.clock.now(),
            region,
            Some(image.file_name().to_string()),
            Some(preview),
        );
        let record = entry.to_record(None);

        let evicted = {
            let mut entries = self.inner.entries.lock();
            entries.insert(0, entry);
            let cap = self.inner.max_entries.min(entries.len());
            entries.split_off(cap)
        };
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), "Collection over capacity, dropping oldest");
            self.release_all(evicted);
        }

        match authority {
            Authority::Local => {
                self.persist_snapshot();
            }
            Authority::Remote(token) => {
                let remote = self.inner.remote.clone();
                self.spawn_write(async move {
                    if let Err(e) = remote.upload_image(token.as_str(), &record.id, &image).await {
                        warn!(entry_id = %record.id, error = %e, "Image upload failed");
                    }
                    if let Err(e) = remote.save(token.as_str(), &record).await {
                        warn!(entry_id = %record.id, error = %e, "Saving new entry failed");
                    }
                });
            }
        }

        debug!(entry_id = %id, "Entry appended");
        id
    }

    /// Apply a scan outcome to an `Analyzing` entry.
    pub async fn complete(
        &self,
        target: CompletionTarget,
        outcome: EntryOutcome,
    ) -> SyncResult<EntryId> {
        let authority = self.authority();

        let (id, record, species, status) = {
            let mut entries = self.inner.entries.lock();
            let index = match &target {
                CompletionTarget::Id(id) => entries
                    .iter()
                    .position(|entry| entry.id() == id)
                    .ok_or_else(|| SyncError::NotFound(id.to_string()))?,
                CompletionTarget::Latest => entries
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| entry.is_analyzing())
                    .min_by_key(|(_, entry)| entry.created_at())
                    .map(|(index, _)| index)
                    .ok_or(SyncError::NothingAnalyzing)?,
            };
            let entry = &mut entries[index];
            entry.finalize(outcome)?;
            (
                entry.id().clone(),
                entry.to_record(None),
                entry.species().map(str::to_string),
                entry.status(),
            )
        };
        debug!(entry_id = %id, status = ?status, "Entry finalized");

        match authority {
            Authority::Local => {
                self.persist_snapshot();
            }
            Authority::Remote(token) if status == EntryStatus::Completed => {
                let inner = self.inner.clone();
                let entry_id = id.clone();
                self.spawn_write(async move {
                    push_record(&inner, &token, entry_id, &record, species).await;
                });
            }
            Authority::Remote(_) => {}
        }
        Ok(id)
    }

    /// Push completed entries whose earlier push failed. Returns how many
    /// succeeded.
    pub async fn retry_unsynced_pushes(&self) -> usize {
        let Authority::Remote(token) = self.authority() else {
            debug!("No backend session, leaving unsynced entries queued");
            return 0;
        };

        let pending: Vec<(EntryId, CollectionItemRecord, Option<String>)> = {
            let unsynced = self.inner.unsynced.lock();
            self.inner
                .entries
                .lock()
                .iter()
                .filter(|entry| unsynced.contains(entry.id()))
                .map(|entry| {
                    (
                        entry.id().clone(),
                        entry.to_record(None),
                        entry.species().map(str::to_string),
                    )
                })
                .collect()
        };

        let mut pushed = 0;
        for (id, record, species) in pending {
            if push_record(&self.inner, &token, id, &record, species).await {
                pushed += 1;
            }
        }
        pushed
    }

    /// Drop one entry. The entry leaves memory and its preview is released
    /// before this returns. Remote deletes are queued behind earlier
    /// background writes and are best effort. Returns false if it was not
    /// in the list.
    pub async fn remove(&self, id: &EntryId) -> bool {
        let authority = self.authority();

        let removed = {
            let mut entries = self.inner.entries.lock();
            entries
                .iter()
                .position(|entry| entry.id() == id)
                .map(|index| entries.remove(index))
        };
        self.inner.unsynced.lock().remove(id);
        let found = removed.is_some();
        if let Some(entry) = removed {
            self.release_all(vec![entry]);
        }

        match authority {
            Authority::Remote(token) => {
                let remote = self.inner.remote.clone();
                let id = id.clone();
                self.spawn_write(async move {
                    let (record, image) = tokio::join!(
                        remote.delete_item(token.as_str(), id.as_str()),
                        remote.delete_image(token.as_str(), id.as_str()),
                    );
                    if let Err(e) = record {
                        warn!(entry_id = %id, error = %e, "Remote record delete failed");
                    }
                    if let Err(e) = image {
                        warn!(entry_id = %id, error = %e, "Remote image delete failed");
                    }
                });
            }
            Authority::Local => {
                self.persist_snapshot();
            }
        }
        found
    }

    /// Drop every entry from memory and the authoritative store. Remote
    /// clears are queued like [`Self::remove`].
    pub async fn clear(&self) {
        let authority = self.authority();

        let previous = std::mem::take(&mut *self.inner.entries.lock());
        self.inner.unsynced.lock().clear();
        self.release_all(previous);

        match authority {
            Authority::Remote(token) => {
                let remote = self.inner.remote.clone();
                self.spawn_write(async move {
                    let (records, images) = tokio::join!(
                        remote.clear(token.as_str()),
                        remote.clear_images(token.as_str()),
                    );
                    if let Err(e) = records {
                        warn!(error = %e, "Remote collection clear failed");
                    }
                    if let Err(e) = images {
                        warn!(error = %e, "Remote image clear failed");
                    }
                });
            }
            Authority::Local => {
                if let Err(e) = self.inner.local.clear_collection() {
                    warn!(error = %e, "Failed to clear local collection");
                }
            }
        }
        info!("Collection cleared");
    }

    /// Write `entries` to the local store, degrading under capacity limits.
    pub fn persist_local(&self, entries: &[CollectionEntry]) -> PersistOutcome {
        let outcome = persist_local(&self.inner.local, entries);
        if outcome != PersistOutcome::Complete {
            warn!(outcome = ?outcome, entries = entries.len(), "Local persistence degraded");
        }
        outcome
    }

    /// Wait for background remote writes spawned so far.
    pub async fn wait_for_background(&self) {
        let tail = self.inner.last_write.lock().take();
        if let Some(handle) = tail {
            if let Err(e) = handle.await {
                warn!(error = %e, "Background write task failed");
            }
        }
    }

    // ==========================================
    // Internals
    // ==========================================

    fn authority(&self) -> Authority {
        let session = self.inner.session.borrow();
        match session.bearer_token() {
            Some(token) if session.is_fully_authenticated() => Authority::Remote(token.clone()),
            _ => Authority::Local,
        }
    }

    fn persist_snapshot(&self) -> PersistOutcome {
        let snapshot = self.entries();
        self.persist_local(&snapshot)
    }

    fn release_all(&self, entries: Vec<CollectionEntry>) {
        for mut entry in entries {
            if let Some(preview) = entry.take_preview() {
                self.inner.previews.release(&preview);
            }
        }
    }

    /// Run `write` after every previously spawned write has finished.
    fn spawn_write<F>(&self, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tail = self.inner.last_write.lock();
        let previous = tail.take();
        *tail = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!(error = %e, "Background write task failed");
                }
            }
            write.await;
        }));
    }
}

/// Save a completed record remotely. Emits `EntryPushed` only on success;
/// a failure parks the id in the unsynced set.
async fn push_record(
    inner: &EngineInner,
    token: &BearerToken,
    entry_id: EntryId,
    record: &CollectionItemRecord,
    species: Option<String>,
) -> bool {
    match inner.remote.save(token.as_str(), record).await {
        Ok(()) => {
            inner.unsynced.lock().remove(&entry_id);
            debug!(entry_id = %entry_id, "Completed entry pushed");
            // No subscribers is fine.
            let _ = inner
                .events
                .send(CollectionEvent::EntryPushed { entry_id, species });
            true
        }
        Err(e) => {
            warn!(entry_id = %entry_id, error = %e, "Push of completed entry failed");
            inner.unsynced.lock().insert(entry_id);
            false
        }
    }
}

impl std::fmt::Debug for CollectionSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionSyncEngine")
            .field("entries", &self.inner.entries.lock().len())
            .field("max_entries", &self.inner.max_entries)
            .finish_non_exhaustive()
    }
}
