//! Collection entries and their conversion to and from wire records.

use crate::{Classification, SyncError, SyncResult};
use chrono::{DateTime, Utc};
use image_preview::{DurablePreview, Preview};
use remote_collection_client::{CollectionItemRecord, PlantReport, RecordStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Opaque entry identifier, assigned once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Analyzing,
    Completed,
    Error,
}

impl From<EntryStatus> for RecordStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Analyzing => RecordStatus::Analyzing,
            EntryStatus::Completed => RecordStatus::Completed,
            EntryStatus::Error => RecordStatus::Error,
        }
    }
}

/// Result of a scan, applied once to an `Analyzing` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Completed(PlantReport),
    Error,
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    Analyzing,
    Completed {
        report: PlantReport,
        classification: Classification,
    },
    Error,
}

/// One scan in the user's collection.
///
/// A result exists exactly when the status is `Completed`, and a finalized
/// entry never changes again.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    id: EntryId,
    created_at: DateTime<Utc>,
    region: String,
    file_name: Option<String>,
    preview: Option<Preview>,
    species: Option<String>,
    description: Option<String>,
    stage: Stage,
}

impl CollectionEntry {
    pub(crate) fn analyzing(
        id: EntryId,
        created_at: DateTime<Utc>,
        region: String,
        file_name: Option<String>,
        preview: Option<Preview>,
    ) -> Self {
        Self {
            id,
            created_at,
            region,
            file_name,
            preview,
            species: None,
            description: None,
            stage: Stage::Analyzing,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn species(&self) -> Option<&str> {
        self.species.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> EntryStatus {
        match self.stage {
            Stage::Analyzing => EntryStatus::Analyzing,
            Stage::Completed { .. } => EntryStatus::Completed,
            Stage::Error => EntryStatus::Error,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.stage, Stage::Analyzing)
    }

    pub fn result(&self) -> Option<&Classification> {
        match &self.stage {
            Stage::Completed { classification, .. } => Some(classification),
            _ => None,
        }
    }

    /// Raw analysis report behind [`CollectionEntry::result`].
    pub fn report(&self) -> Option<&PlantReport> {
        match &self.stage {
            Stage::Completed { report, .. } => Some(report),
            _ => None,
        }
    }

    pub(crate) fn finalize(&mut self, outcome: EntryOutcome) -> SyncResult<()> {
        if !self.is_analyzing() {
            return Err(SyncError::AlreadyFinalized(self.id.to_string()));
        }
        self.stage = match outcome {
            EntryOutcome::Completed(report) => {
                let classification = Classification::from_report(&report, &self.region);
                self.species = classification.species_summary();
                self.description = classification.description_summary();
                Stage::Completed {
                    report,
                    classification,
                }
            }
            EntryOutcome::Error => Stage::Error,
        };
        Ok(())
    }

    pub(crate) fn take_preview(&mut self) -> Option<Preview> {
        self.preview.take()
    }

    /// Wire record. Only a durable preview is ever embedded.
    pub(crate) fn to_record(&self, embed: Option<&DurablePreview>) -> CollectionItemRecord {
        CollectionItemRecord {
            id: self.id.to_string(),
            timestamp: self.created_at,
            region: self.region.clone(),
            status: self.status().into(),
            species: self.species.clone(),
            description: self.description.clone(),
            plant_data: self.report().cloned(),
            filename: self.file_name.clone(),
            preview: embed.map(|d| d.as_str().to_string()),
        }
    }

    /// Rebuild an entry from a stored record. A completed record without a
    /// report becomes an `Error` entry and reports on other statuses are
    /// dropped.
    pub(crate) fn from_record(record: CollectionItemRecord, preview: Option<Preview>) -> Self {
        let stage = match (record.status, record.plant_data) {
            (RecordStatus::Completed, Some(report)) => {
                let classification = Classification::from_report(&report, &record.region);
                Stage::Completed {
                    report,
                    classification,
                }
            }
            (RecordStatus::Completed, None) => {
                warn!(entry_id = %record.id, "Completed record has no result, marking as error");
                Stage::Error
            }
            (RecordStatus::Analyzing, _) => Stage::Analyzing,
            (RecordStatus::Error, _) => Stage::Error,
        };

        let (species, description) = match &stage {
            Stage::Completed { classification, .. } => (
                record.species.or_else(|| classification.species_summary()),
                record
                    .description
                    .or_else(|| classification.description_summary()),
            ),
            _ => (record.species, record.description),
        };

        Self {
            id: EntryId::from(record.id),
            created_at: record.timestamp,
            region: record.region,
            file_name: record.filename,
            preview,
            species,
            description,
            stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> CollectionEntry {
        CollectionEntry::analyzing(
            EntryId::from("e1"),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            "Central Texas".into(),
            Some("leaf.jpg".into()),
            None,
        )
    }

    fn privet() -> PlantReport {
        PlantReport {
            specie_identified: Some("Chinese Privet (Ligustrum sinense)".into()),
            native_region: Some("China".into()),
            invasive_or_not: true,
            ..PlantReport::default()
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = EntryId::generate();
        let b = EntryId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_finalize_sets_result_and_summary() {
        let mut entry = entry();
        assert!(entry.result().is_none());

        entry.finalize(EntryOutcome::Completed(privet())).unwrap();
        assert_eq!(entry.status(), EntryStatus::Completed);
        assert!(entry.result().is_some());
        assert_eq!(entry.species(), Some("Chinese Privet"));
        assert_eq!(
            entry.description(),
            Some("Identified as Chinese Privet (Ligustrum sinense). Native region: China.")
        );
    }

    #[test]
    fn test_finalize_twice_is_rejected() {
        let mut entry = entry();
        entry.finalize(EntryOutcome::Error).unwrap();
        assert!(entry.result().is_none());

        let err = entry.finalize(EntryOutcome::Completed(privet())).unwrap_err();
        assert!(matches!(err, SyncError::AlreadyFinalized(id) if id == "e1"));
        assert_eq!(entry.status(), EntryStatus::Error);
    }

    #[test]
    fn test_record_without_report_becomes_error() {
        let mut record = entry().to_record(None);
        record.status = RecordStatus::Completed;
        let restored = CollectionEntry::from_record(record, None);
        assert_eq!(restored.status(), EntryStatus::Error);
        assert!(restored.result().is_none());
    }

    #[test]
    fn test_report_on_analyzing_record_is_dropped() {
        let mut record = entry().to_record(None);
        record.plant_data = Some(privet());
        let restored = CollectionEntry::from_record(record, None);
        assert_eq!(restored.status(), EntryStatus::Analyzing);
        assert!(restored.report().is_none());
    }

    #[test]
    fn test_completed_record_round_trip() {
        let mut original = entry();
        original.finalize(EntryOutcome::Completed(privet())).unwrap();

        let record = original.to_record(None);
        assert_eq!(record.status, RecordStatus::Completed);
        assert!(record.preview.is_none());

        let restored = CollectionEntry::from_record(record, None);
        assert_eq!(restored, original);
    }
}
