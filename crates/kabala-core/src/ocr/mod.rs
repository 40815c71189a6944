//! OCR engine contract and adapters.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;

use crate::error::OcrError;

/// Anything that can turn a receipt image into raw text.
///
/// The pipeline depends only on this contract; engines are free to ignore
/// the language hint when their models are language-specific.
pub trait OcrEngine {
    /// Recognize text in `image`, returning lines in reading order.
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;
}

impl<T: OcrEngine + ?Sized> OcrEngine for &T {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        (**self).recognize(image, language)
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        (**self).recognize(image, language)
    }
}

/// A recognized line with its axis-aligned position, used for ordering.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Recognized text content.
    pub text: String,
    /// Bounding rectangle (min_x, min_y, max_x, max_y) in pixels.
    pub rect: (f32, f32, f32, f32),
    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

/// Sort lines top-to-bottom, then right-to-left within a row, and join them.
///
/// Rows are grouped by 20 px bands of the top edge.
pub fn join_reading_order(mut lines: Vec<TextLine>) -> String {
    lines.sort_by(|a, b| {
        let row_a = (a.rect.1 / 20.0) as i32;
        let row_b = (b.rect.1 / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            b.rect.0
                .partial_cmp(&a.rect.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x: f32, y: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            rect: (x, y, x + 50.0, y + 15.0),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_reading_order_is_top_down_right_to_left() {
        let lines = vec![
            line("45.90", 10.0, 105.0),
            line("קפה", 300.0, 12.0),
            line("סה\"כ", 300.0, 100.0),
        ];

        assert_eq!(join_reading_order(lines), "קפה\nסה\"כ\n45.90");
    }

    struct Fixed(&'static str);

    impl OcrEngine for Fixed {
        fn recognize(&self, _: &DynamicImage, _: &str) -> Result<String, OcrError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_boxed_engine_delegates() {
        let engine: Box<dyn OcrEngine> = Box::new(Fixed("סה\"כ 3.00"));
        let image = DynamicImage::new_rgb8(1, 1);
        assert_eq!(engine.recognize(&image, "heb").unwrap(), "סה\"כ 3.00");
    }
}
