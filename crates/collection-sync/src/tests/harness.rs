//! Test harness for engine tests.
//!
//! Provides:
//! - FakeRemoteStore: in-memory records and images with per-operation failure
//!   switches and call counters
//! - ManualClock: timestamps advanced by the test
//! - EngineHarness: an engine over the fake remote store, memory storage and
//!   a session channel the test flips between signed in and signed out

use crate::{CollectionSyncEngine, Clock, EngineOptions, EntryId};
use async_trait::async_trait;
use auth_bridge::{AuthSession, BackendProfile, BearerToken};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use image_preview::{CapturedImage, ImagePreviewManager};
use parking_lot::Mutex;
use plant_local_storage::{LocalStore, MemoryStorage};
use remote_collection_client::{
    CollectionItemRecord, PlantReport, RemoteCollectionStore, RemoteError, RemoteResult,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub const TOKEN: &str = "bearer-1";

pub fn image(seed: u8) -> CapturedImage {
    CapturedImage::new(vec![seed; 64], "image/jpeg").with_file_name(format!("leaf-{}.jpg", seed))
}

pub fn privet() -> PlantReport {
    PlantReport {
        specie_identified: Some("Chinese Privet (Ligustrum sinense)".into()),
        native_region: Some("China".into()),
        invasive_or_not: true,
        confidence_score: Some(0.92),
        invasive_effects: "Forms dense thickets".into(),
        remove_instructions: "Cut and treat stump".into(),
        ..PlantReport::default()
    }
}

pub fn signed_in() -> AuthSession {
    AuthSession::fully_authenticated(
        None,
        BearerToken::new(TOKEN),
        BackendProfile {
            uid: "user-1".into(),
            email: Some("user-1@example.com".into()),
            name: None,
            picture: None,
            email_verified: true,
        },
    )
}

fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        message: "unavailable".into(),
    }
}

#[derive(Default)]
pub struct FakeRemoteStore {
    records: Mutex<BTreeMap<String, CollectionItemRecord>>,
    images: Mutex<HashMap<String, CapturedImage>>,
    broken_images: Mutex<HashSet<String>>,
    fail_list: AtomicBool,
    fail_save: AtomicBool,
    fail_delete_item: AtomicBool,
    fail_delete_image: AtomicBool,
    hold_uploads: AtomicBool,
    pub saves: Mutex<Vec<CollectionItemRecord>>,
    pub uploads: AtomicUsize,
    pub delete_item_calls: AtomicUsize,
    pub delete_image_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
    pub clear_image_calls: AtomicUsize,
}

impl FakeRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CollectionItemRecord, image: Option<CapturedImage>) {
        if let Some(image) = image {
            self.images.lock().insert(record.id.clone(), image);
        }
        self.records.lock().insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &EntryId) -> Option<CollectionItemRecord> {
        self.records.lock().get(id.as_str()).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn has_image(&self, id: &EntryId) -> bool {
        self.images.lock().contains_key(id.as_str())
    }

    /// Fetching this id's image fails with a 503.
    pub fn break_image(&self, id: &str) {
        self.broken_images.lock().insert(id.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_item(&self, fail: bool) {
        self.fail_delete_item.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete_image(&self, fail: bool) {
        self.fail_delete_image.store(fail, Ordering::SeqCst);
    }

    /// Uploads wait until released.
    pub fn hold_uploads(&self, hold: bool) {
        self.hold_uploads.store(hold, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteCollectionStore for FakeRemoteStore {
    async fn list(&self, token: &str) -> RemoteResult<Vec<CollectionItemRecord>> {
        authorize(token)?;
        tokio::task::yield_now().await;
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.records.lock().values().cloned().collect())
    }

    async fn save(&self, token: &str, record: &CollectionItemRecord) -> RemoteResult<()> {
        authorize(token)?;
        tokio::task::yield_now().await;
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let record = record.for_remote();
        self.saves.lock().push(record.clone());
        self.records.lock().insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete_item(&self, token: &str, id: &str) -> RemoteResult<()> {
        authorize(token)?;
        self.delete_item_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_item.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.records.lock().remove(id);
        Ok(())
    }

    async fn clear(&self, token: &str) -> RemoteResult<()> {
        authorize(token)?;
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().clear();
        Ok(())
    }

    async fn upload_image(&self, token: &str, id: &str, image: &CapturedImage) -> RemoteResult<()> {
        authorize(token)?;
        tokio::task::yield_now().await;
        while self.hold_uploads.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.images.lock().insert(id.to_string(), image.clone());
        Ok(())
    }

    async fn fetch_image(&self, token: &str, id: &str) -> RemoteResult<Option<CapturedImage>> {
        authorize(token)?;
        tokio::task::yield_now().await;
        if self.broken_images.lock().contains(id) {
            return Err(unavailable());
        }
        Ok(self.images.lock().get(id).cloned())
    }

    async fn delete_image(&self, token: &str, id: &str) -> RemoteResult<()> {
        authorize(token)?;
        self.delete_image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_image.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.images.lock().remove(id);
        Ok(())
    }

    async fn clear_images(&self, token: &str) -> RemoteResult<()> {
        authorize(token)?;
        self.clear_image_calls.fetch_add(1, Ordering::SeqCst);
        self.images.lock().clear();
        Ok(())
    }
}

fn authorize(token: &str) -> RemoteResult<()> {
    if token == TOKEN {
        Ok(())
    } else {
        Err(RemoteError::Unauthorized)
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock() += ChronoDuration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub struct EngineHarness {
    pub remote: Arc<FakeRemoteStore>,
    pub storage: Arc<MemoryStorage>,
    pub local: LocalStore,
    pub clock: Arc<ManualClock>,
    pub session_tx: watch::Sender<AuthSession>,
    pub max_entries: usize,
    pub engine: CollectionSyncEngine,
}

impl EngineHarness {
    pub fn new(session: AuthSession, storage: MemoryStorage, max_entries: usize) -> Self {
        let remote = Arc::new(FakeRemoteStore::new());
        let storage = Arc::new(storage);
        let local = LocalStore::new(storage.clone());
        let clock = Arc::new(ManualClock::new());
        let (session_tx, _) = watch::channel(session);
        let engine = build_engine(&remote, &local, &clock, &session_tx, max_entries);
        Self {
            remote,
            storage,
            local,
            clock,
            session_tx,
            max_entries,
            engine,
        }
    }

    pub fn signed_out() -> Self {
        Self::new(AuthSession::unauthenticated(), MemoryStorage::new(), 50)
    }

    pub fn signed_in() -> Self {
        Self::new(signed_in(), MemoryStorage::new(), 50)
    }

    pub fn sign_in(&self) {
        self.session_tx.send_replace(signed_in());
    }

    pub fn sign_out(&self) {
        self.session_tx.send_replace(AuthSession::unauthenticated());
    }

    /// A fresh engine over the same stores, as after a page reload.
    pub fn reload(&self) -> CollectionSyncEngine {
        build_engine(
            &self.remote,
            &self.local,
            &self.clock,
            &self.session_tx,
            self.max_entries,
        )
    }

    pub fn stored_records(&self) -> Vec<CollectionItemRecord> {
        self.local.entry_list().unwrap()
    }
}

fn build_engine(
    remote: &Arc<FakeRemoteStore>,
    local: &LocalStore,
    clock: &Arc<ManualClock>,
    session_tx: &watch::Sender<AuthSession>,
    max_entries: usize,
) -> CollectionSyncEngine {
    let options = EngineOptions {
        clock: clock.clone(),
        max_entries,
    };
    CollectionSyncEngine::with_options(
        remote.clone(),
        local.clone(),
        ImagePreviewManager::new(),
        session_tx.subscribe(),
        options,
    )
}
