//! Scan submission: precheck, append, analyze under a deadline, complete.

use crate::{
    CollectionEntry, CollectionSyncEngine, CompletionTarget, EntryId, EntryOutcome, SyncError,
    SyncResult,
};
use async_trait::async_trait;
use image_preview::CapturedImage;
use plant_config_and_utils::{Config, DEFAULT_ANALYSIS_TIMEOUT_SECS};
use remote_collection_client::{PlantAnalysisClient, PlantReport, RemoteError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound for [`BasicImagePrecheck`].
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Rejects images before an entry is created.
pub trait ImagePrecheck: Send + Sync {
    fn validate(&self, image: &CapturedImage) -> Result<(), String>;
}

#[derive(Debug, Clone)]
pub struct BasicImagePrecheck {
    max_bytes: usize,
}

impl BasicImagePrecheck {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for BasicImagePrecheck {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImagePrecheck for BasicImagePrecheck {
    fn validate(&self, image: &CapturedImage) -> Result<(), String> {
        if image.is_empty() {
            return Err("image is empty".to_string());
        }
        if !image.content_type().starts_with("image/") {
            return Err(format!("unsupported content type {}", image.content_type()));
        }
        if image.len() > self.max_bytes {
            return Err(format!(
                "image is {} bytes, limit is {}",
                image.len(),
                self.max_bytes
            ));
        }
        Ok(())
    }
}

/// Classification collaborator.
#[async_trait]
pub trait PlantAnalyzer: Send + Sync {
    async fn analyze(&self, image: &CapturedImage, region: &str) -> SyncResult<PlantReport>;
}

#[async_trait]
impl PlantAnalyzer for PlantAnalysisClient {
    async fn analyze(&self, image: &CapturedImage, region: &str) -> SyncResult<PlantReport> {
        PlantAnalysisClient::analyze(self, image, region)
            .await
            .map_err(|e| match e {
                RemoteError::Timeout(after) => SyncError::AnalysisTimeout(after),
                other => SyncError::Analysis(other.to_string()),
            })
    }
}

/// Runs one scan end to end against the sync engine.
pub struct ScanCoordinator {
    engine: CollectionSyncEngine,
    analyzer: Arc<dyn PlantAnalyzer>,
    precheck: Arc<dyn ImagePrecheck>,
    timeout: Duration,
}

impl ScanCoordinator {
    pub fn new(engine: CollectionSyncEngine, analyzer: Arc<dyn PlantAnalyzer>) -> Self {
        Self {
            engine,
            analyzer,
            precheck: Arc::new(BasicImagePrecheck::default()),
            timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
        }
    }

    pub fn from_config(
        config: &Config,
        engine: CollectionSyncEngine,
        analyzer: Arc<dyn PlantAnalyzer>,
    ) -> Self {
        Self::new(engine, analyzer).with_timeout(config.analysis_timeout())
    }

    pub fn with_precheck(mut self, precheck: Arc<dyn ImagePrecheck>) -> Self {
        self.precheck = precheck;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &CollectionSyncEngine {
        &self.engine
    }

    /// Submit a scan and wait for its classification.
    ///
    /// A rejected image fails before any entry exists. Analysis failures and
    /// timeouts leave the entry in `Error`.
    pub async fn submit_scan(
        &self,
        image: CapturedImage,
        region: &str,
    ) -> SyncResult<CollectionEntry> {
        self.precheck
            .validate(&image)
            .map_err(SyncError::Validation)?;

        let id = self.engine.append(image.clone(), region).await;
        let region = self
            .engine
            .entry(&id)
            .map(|entry| entry.region().to_string())
            .unwrap_or_else(|| region.to_string());

        let analysis = self.analyzer.analyze(&image, &region);
        let report = match tokio::time::timeout(self.timeout, analysis).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!(entry_id = %id, error = %e, "Plant analysis failed");
                self.mark_failed(&id).await;
                return Err(match e {
                    SyncError::AnalysisTimeout(_) | SyncError::Analysis(_) => e,
                    other => SyncError::Analysis(other.to_string()),
                });
            }
            Err(_) => {
                warn!(entry_id = %id, timeout = ?self.timeout, "Plant analysis timed out");
                self.mark_failed(&id).await;
                return Err(SyncError::AnalysisTimeout(self.timeout));
            }
        };

        self.engine
            .complete(CompletionTarget::Id(id.clone()), EntryOutcome::Completed(report))
            .await?;
        info!(entry_id = %id, "Scan completed");
        self.engine
            .entry(&id)
            .ok_or_else(|| SyncError::NotFound(id.to_string()))
    }

    async fn mark_failed(&self, id: &EntryId) {
        if let Err(e) = self
            .engine
            .complete(CompletionTarget::Id(id.clone()), EntryOutcome::Error)
            .await
        {
            warn!(entry_id = %id, error = %e, "Could not mark entry as failed");
        }
    }
}
