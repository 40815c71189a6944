//! Error types for the kabala-core library.

use thiserror::Error;

/// Main error type for the kabala library.
#[derive(Error, Debug)]
pub enum KabalaError {
    /// Receipt upload error.
    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Report rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Session state error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// PDF receipt reading error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading an uploaded receipt.
#[derive(Error, Debug)]
pub enum UploadError {
    /// No file at the given location.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The file exists but could not be read or decoded.
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// The file type is not an image or PDF.
    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors related to report rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An attachment could not be resolved or decoded.
    #[error("cannot load attachment {0}: {1}")]
    Attachment(String, String),

    /// An image could not be encoded for embedding.
    #[error("cannot encode image: {0}")]
    Encode(String),

    /// Text could not be rasterized.
    #[error("cannot rasterize text: {0}")]
    Font(String),

    /// The PDF document could not be serialized.
    #[error("cannot write PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    /// I/O error while writing the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the upload-and-recognize session.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// An upload is already in flight.
    #[error("an upload is already being processed")]
    Busy,

    /// The operation does not apply to the current upload state.
    #[error("no upload in progress")]
    NotUploading,

    /// Employee details are incomplete.
    #[error("missing employee {0}")]
    MissingEmployeeField(&'static str),
}

/// Errors related to reading PDF receipts.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Result type for the kabala library.
pub type Result<T> = std::result::Result<T, KabalaError>;
