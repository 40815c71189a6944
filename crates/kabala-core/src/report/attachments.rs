//! Resolving attachment handles to receipt images at render time.

use std::collections::HashMap;
use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::error::RenderError;
use crate::models::AttachmentRef;
use crate::pdf::PdfExtractor;

use super::AttachmentSource;

/// Attachments stored as files; the handle is the path.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAttachments;

impl AttachmentSource for FileAttachments {
    fn load(&self, attachment: &AttachmentRef) -> Result<DynamicImage, RenderError> {
        let path = Path::new(attachment.as_str());
        let data = std::fs::read(path)
            .map_err(|e| RenderError::Attachment(attachment.to_string(), e.to_string()))?;
        decode_attachment(attachment, &data)
    }
}

/// Attachments held in memory, keyed by handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttachments {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: impl Into<String>, data: Vec<u8>) {
        self.files.insert(handle.into(), data);
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.files.contains_key(handle)
    }
}

impl AttachmentSource for MemoryAttachments {
    fn load(&self, attachment: &AttachmentRef) -> Result<DynamicImage, RenderError> {
        let data = self.files.get(attachment.as_str()).ok_or_else(|| {
            RenderError::Attachment(attachment.to_string(), "not uploaded".to_string())
        })?;
        decode_attachment(attachment, data)
    }
}

/// Decode an image file, or the first scan inside a PDF receipt.
pub fn decode_attachment(
    attachment: &AttachmentRef,
    data: &[u8],
) -> Result<DynamicImage, RenderError> {
    let fail = |reason: String| RenderError::Attachment(attachment.to_string(), reason);

    if attachment.is_pdf() || data.starts_with(b"%PDF") {
        debug!("Taking receipt image for {} from PDF", attachment);
        let extractor = PdfExtractor::load(data).map_err(|e| fail(e.to_string()))?;
        return extractor.first_image(1).map_err(|e| fail(e.to_string()));
    }

    image::load_from_memory(data).map_err(|e| fail(e.to_string()))
}
