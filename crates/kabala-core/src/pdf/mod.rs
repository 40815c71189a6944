//! Reading receipts uploaded as PDF documents.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Minimum embedded text length for a PDF receipt to skip OCR.
pub const MIN_TEXT_LENGTH: usize = 10;
