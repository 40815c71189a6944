//! Receipt fields recovered from raw OCR text.

pub mod amounts;
pub mod dates;
pub mod patterns;

pub use amounts::{extract_amount, AmountExtractor, AmountMatcher, MATCHERS};
pub use dates::{extract_date, DateExtractor};

/// Finds one receipt field in recognized text.
pub trait FieldExtractor {
    type Output;

    /// Best candidate, or `None` when the text has none.
    fn extract(&self, text: &str) -> Option<ExtractionMatch<Self::Output>>;
}

/// A field value with where it was found and how much to trust it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    pub value: T,
    /// Matcher confidence in 0.0..=1.0.
    pub confidence: f32,
    /// Byte span of the value in the searched text.
    pub position: Option<(usize, usize)>,
    /// The matched text as it appeared.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
