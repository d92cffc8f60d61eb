use crate::{CapturedImage, DurablePreview, PreviewHandle, PreviewRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

/// The preview attached to a collection entry. Exactly one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Ephemeral(PreviewHandle),
    Durable(DurablePreview),
}

impl Preview {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Preview::Ephemeral(_))
    }

    pub fn handle(&self) -> Option<&PreviewHandle> {
        match self {
            Preview::Ephemeral(handle) => Some(handle),
            Preview::Durable(_) => None,
        }
    }

    pub fn durable(&self) -> Option<&DurablePreview> {
        match self {
            Preview::Durable(durable) => Some(durable),
            Preview::Ephemeral(_) => None,
        }
    }

    /// String a renderer can use as an image source.
    pub fn source(&self) -> &str {
        match self {
            Preview::Ephemeral(handle) => handle.as_str(),
            Preview::Durable(durable) => durable.as_str(),
        }
    }
}

/// Which store is authoritative for the entry receiving a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewTarget {
    /// The local store; the preview must survive a reload on its own.
    Local,
    /// The remote store holds the binary; keep only a session handle.
    Remote,
}

/// Creates, restores and releases entry previews.
#[derive(Debug, Clone, Default)]
pub struct ImagePreviewManager {
    registry: Arc<PreviewRegistry>,
}

impl ImagePreviewManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Arc<PreviewRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }

    /// Preview for a freshly captured image.
    pub fn attach_for_capture(&self, image: &CapturedImage, target: PreviewTarget) -> Preview {
        match target {
            PreviewTarget::Local => Preview::Durable(DurablePreview::encode(image)),
            PreviewTarget::Remote => Preview::Ephemeral(self.registry.create(image.clone())),
        }
    }

    /// Preview for a binary fetched from the remote image store.
    pub fn attach_remote_binary(&self, image: CapturedImage) -> Preview {
        Preview::Ephemeral(self.registry.create(image))
    }

    /// Preview from a string read out of the local store. Ephemeral handles
    /// from a previous session and malformed strings yield `None`.
    pub fn restore_durable(&self, raw: &str) -> Option<Preview> {
        if PreviewHandle::looks_ephemeral(raw) {
            debug!("Ignoring stale ephemeral preview from local store");
            return None;
        }
        match DurablePreview::parse(raw) {
            Ok(durable) => Some(Preview::Durable(durable)),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored preview");
                None
            }
        }
    }

    /// Release a preview that is being dropped. Returns true if an ephemeral
    /// handle was revoked.
    pub fn release(&self, preview: &Preview) -> bool {
        match preview {
            Preview::Ephemeral(handle) => self.registry.revoke(handle),
            Preview::Durable(_) => false,
        }
    }

    /// Image bytes behind a preview, if still available.
    pub fn resolve(&self, preview: &Preview) -> Option<CapturedImage> {
        match preview {
            Preview::Ephemeral(handle) => self.registry.resolve(handle),
            Preview::Durable(durable) => durable
                .decode()
                .ok()
                .map(|decoded| CapturedImage::new(decoded.bytes, decoded.content_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> CapturedImage {
        CapturedImage::new(vec![1, 2, 3, 4], "image/png")
    }

    #[test]
    fn test_local_capture_is_durable_only() {
        let manager = ImagePreviewManager::new();
        let preview = manager.attach_for_capture(&image(), PreviewTarget::Local);

        assert!(preview.durable().is_some());
        assert!(preview.handle().is_none());
        assert_eq!(manager.registry().live_count(), 0);
        assert_eq!(manager.resolve(&preview).unwrap().bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_remote_capture_is_ephemeral_only() {
        let manager = ImagePreviewManager::new();
        let preview = manager.attach_for_capture(&image(), PreviewTarget::Remote);

        assert!(preview.is_ephemeral());
        assert!(preview.durable().is_none());
        assert_eq!(manager.registry().live_count(), 1);

        assert!(manager.release(&preview));
        assert_eq!(manager.registry().live_count(), 0);
        assert!(manager.resolve(&preview).is_none());
    }

    #[test]
    fn test_release_durable_is_noop() {
        let manager = ImagePreviewManager::new();
        let preview = manager.attach_for_capture(&image(), PreviewTarget::Local);
        assert!(!manager.release(&preview));
    }

    #[test]
    fn test_restore_durable_filters_stale_forms() {
        let manager = ImagePreviewManager::new();
        assert!(manager.restore_durable("blob:http://old/abc").is_none());
        assert!(manager.restore_durable("not a preview").is_none());

        let encoded = DurablePreview::encode(&image()).into_string();
        let restored = manager.restore_durable(&encoded).unwrap();
        assert_eq!(restored.source(), encoded);
    }
}
