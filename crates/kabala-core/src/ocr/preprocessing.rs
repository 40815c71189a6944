//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::OcrError;

/// Image preprocessor applied to receipts before recognition.
pub struct ImagePreprocessor {
    /// Maximum image dimension.
    max_size: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self { max_size: 2048 }
    }

    /// Set maximum image dimension.
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Downscale oversized receipts, keeping the aspect ratio.
    pub fn prepare(&self, image: &DynamicImage) -> Result<DynamicImage, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!(
                "empty image {}x{}",
                width, height
            )));
        }

        let (new_width, new_height) = self.calculate_resize_dimensions(width, height, self.max_size);
        if (new_width, new_height) == (width, height) {
            return Ok(image.clone());
        }

        debug!(
            "Resizing receipt from {}x{} to {}x{}",
            width, height, new_width, new_height
        );
        Ok(image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3))
    }

    /// Calculate dimensions that fit within `max_size` on the longer side.
    fn calculate_resize_dimensions(&self, width: u32, height: u32, max_size: u32) -> (u32, u32) {
        let longer = width.max(height);
        if longer <= max_size || max_size == 0 {
            return (width, height);
        }

        let ratio = max_size as f32 / longer as f32;
        let new_width = ((width as f32 * ratio).round() as u32).max(1);
        let new_height = ((height as f32 * ratio).round() as u32).max(1);
        (new_width, new_height)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}
