use std::sync::Arc;

/// Binary image data captured or uploaded by the user.
///
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    content_type: String,
    file_name: String,
}

impl CapturedImage {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let file_name = format!("image.{}", extension_for(&content_type));
        Self {
            bytes: Arc::from(bytes.into()),
            content_type,
            file_name,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_content_type() {
        assert_eq!(CapturedImage::new(vec![1], "image/png").file_name(), "image.png");
        assert_eq!(CapturedImage::new(vec![1], "image/jpeg").file_name(), "image.jpg");
        assert_eq!(
            CapturedImage::new(vec![1], "image/png")
                .with_file_name("leaf.png")
                .file_name(),
            "leaf.png"
        );
    }

    #[test]
    fn clones_share_bytes() {
        let image = CapturedImage::new(vec![1, 2, 3], "image/jpeg");
        let copy = image.clone();
        assert_eq!(copy.bytes(), &[1, 2, 3]);
        assert!(std::ptr::eq(image.bytes().as_ptr(), copy.bytes().as_ptr()));
    }
}
