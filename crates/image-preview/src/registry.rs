//! Session-scoped ephemeral preview handles.

use crate::CapturedImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

const HANDLE_PREFIX: &str = "blob:preview/";

/// Opaque reference to image bytes held by a [`PreviewRegistry`].
///
/// Only meaningful inside the session that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    fn generate() -> Self {
        Self(format!("{}{}", HANDLE_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a stored preview string looks like an ephemeral handle.
    pub fn looks_ephemeral(raw: &str) -> bool {
        raw.starts_with("blob:")
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live ephemeral handles for the current session.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: Mutex<HashMap<PreviewHandle, CapturedImage>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, image: CapturedImage) -> PreviewHandle {
        let handle = PreviewHandle::generate();
        self.live.lock().insert(handle.clone(), image);
        debug!(handle = %handle, "Created preview handle");
        handle
    }

    pub fn resolve(&self, handle: &PreviewHandle) -> Option<CapturedImage> {
        self.live.lock().get(handle).cloned()
    }

    /// Revoke a handle. Returns false if it was already revoked.
    pub fn revoke(&self, handle: &PreviewHandle) -> bool {
        let removed = self.live.lock().remove(handle).is_some();
        if removed {
            debug!(handle = %handle, "Revoked preview handle");
        }
        removed
    }

    /// Revoke every live handle, as on session teardown.
    pub fn revoke_all(&self) -> usize {
        let mut live = self.live.lock();
        let count = live.len();
        live.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
