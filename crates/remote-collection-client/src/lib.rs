//! Remote collection store and plant analysis clients.
//!
//! [`RemoteCollectionStore`] is the seam the sync engine writes through;
//! [`HttpCollectionClient`] implements it against the backend API.

mod analysis;
mod client;
mod error;
mod records;
mod store;

pub use analysis::PlantAnalysisClient;
pub use client::HttpCollectionClient;
pub use error::{RemoteError, RemoteResult};
pub use records::{
    decode_records, CollectionItemRecord, CollectionListResponse, NativeAlternativeReport, PlantReport,
    RecordStatus, RewardsSummary,
};
pub use store::RemoteCollectionStore;
