use crate::{CollectionItemRecord, RemoteResult};
use async_trait::async_trait;
use image_preview::CapturedImage;

/// Per-user remote collection and image storage.
///
/// Every call carries the bearer token of the session that issued it.
#[async_trait]
pub trait RemoteCollectionStore: Send + Sync {
    async fn list(&self, token: &str) -> RemoteResult<Vec<CollectionItemRecord>>;

    /// Insert or replace a record keyed by its id.
    async fn save(&self, token: &str, record: &CollectionItemRecord) -> RemoteResult<()>;

    async fn delete_item(&self, token: &str, id: &str) -> RemoteResult<()>;

    async fn clear(&self, token: &str) -> RemoteResult<()>;

    async fn upload_image(&self, token: &str, id: &str, image: &CapturedImage) -> RemoteResult<()>;

    /// Image stored for `id`, or `None` when there is none.
    async fn fetch_image(&self, token: &str, id: &str) -> RemoteResult<Option<CapturedImage>>;

    async fn delete_image(&self, token: &str, id: &str) -> RemoteResult<()>;

    async fn clear_images(&self, token: &str) -> RemoteResult<()>;
}
