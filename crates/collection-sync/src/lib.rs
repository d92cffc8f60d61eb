//! Collection synchronization for the plant imager.
//!
//! This crate provides:
//! - [`CollectionSyncEngine`]: the ordered collection, backed by the remote
//!   store with a backend session and by the local store without one
//! - [`Classification`]: typed analysis results mapped from [`PlantReport`]
//! - [`ScanCoordinator`]: precheck, append, analyze and complete one scan
//!
//! [`PlantReport`]: remote_collection_client::PlantReport

mod classification;
mod clock;
mod engine;
mod entry;
mod error;
mod events;
mod persist;
mod scan;

#[cfg(test)]
mod tests;

pub use classification::{
    display_name, is_likely_scientific_name, normalize_species_names, Classification,
    InvasiveStatus, NativeAlternative, PlantIdentification, SpeciesNames,
};
pub use clock::{Clock, SystemClock};
pub use engine::{CollectionSyncEngine, CompletionTarget, EngineOptions};
pub use entry::{CollectionEntry, EntryId, EntryOutcome, EntryStatus};
pub use error::{SyncError, SyncResult};
pub use events::CollectionEvent;
pub use persist::PersistOutcome;
pub use scan::{
    BasicImagePrecheck, ImagePrecheck, PlantAnalyzer, ScanCoordinator, DEFAULT_MAX_IMAGE_BYTES,
};
