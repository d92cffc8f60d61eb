//! Preview data attached to collection entries.
//!
//! A preview takes one of two forms:
//! - an ephemeral [`PreviewHandle`] into the session-scoped [`PreviewRegistry`],
//!   which must be revoked when its entry is deleted or replaced and is never
//!   persisted;
//! - a self-contained [`DurablePreview`] data URL, safe to write to the local
//!   store.
//!
//! [`ImagePreviewManager`] decides which form a new capture gets.

mod durable;
mod image;
mod manager;
mod registry;

pub use durable::{DecodedPreview, DurablePreview};
pub use image::CapturedImage;
pub use manager::{ImagePreviewManager, Preview, PreviewTarget};
pub use registry::{PreviewHandle, PreviewRegistry};

use thiserror::Error;

/// Errors raised while parsing or decoding previews.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Not a durable preview: {0}")]
    NotDurable(String),

    #[error("Malformed durable preview: {0}")]
    Malformed(String),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

pub type PreviewResult<T> = Result<T, PreviewError>;
