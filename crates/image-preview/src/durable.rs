//! Self-contained `data:` URL previews.

use crate::{CapturedImage, PreviewError, PreviewResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// A preview string that can be embedded in the persisted collection.
///
/// Format: `data:<content-type>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurablePreview(String);

/// Bytes recovered from a [`DurablePreview`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPreview {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DurablePreview {
    pub fn encode(image: &CapturedImage) -> Self {
        Self(format!(
            "data:{};base64,{}",
            image.content_type(),
            BASE64.encode(image.bytes())
        ))
    }

    /// Accept a stored preview string if it is in durable form.
    pub fn parse(raw: impl Into<String>) -> PreviewResult<Self> {
        let raw = raw.into();
        let Some(rest) = raw.strip_prefix("data:") else {
            return Err(PreviewError::NotDurable(truncate(&raw)));
        };
        if !rest.contains(";base64,") {
            return Err(PreviewError::Malformed(truncate(&raw)));
        }
        Ok(Self(raw))
    }

    pub fn decode(&self) -> PreviewResult<DecodedPreview> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| PreviewError::NotDurable(truncate(&self.0)))?;
        let (content_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| PreviewError::Malformed(truncate(&self.0)))?;

        Ok(DecodedPreview {
            content_type: content_type.to_string(),
            bytes: BASE64.decode(payload)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn truncate(raw: &str) -> String {
    raw.chars().take(32).collect()
}
