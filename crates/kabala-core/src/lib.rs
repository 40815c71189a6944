//! Core library for receipt OCR and Hebrew expense reimbursement reports.
//!
//! This crate provides:
//! - Total amount and date extraction from recognized receipt text
//! - The ordered expense store and the upload-and-recognize session
//! - Right-to-left report layout and PDF output
//! - Reading PDF receipts and a pure-Rust OCR adapter (feature `native`)

pub mod error;
pub mod extract;
pub mod mail;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod profile;
pub mod report;
pub mod session;

pub use error::{KabalaError, Result};
pub use extract::{extract_amount, extract_date};
pub use mail::MailDraft;
pub use models::config::KabalaConfig;
pub use models::{AttachmentRef, EmployeeDetails, ExpenseEntry, ExpenseField, ExpenseStore};
pub use ocr::OcrEngine;
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use profile::ProfileStore;
pub use report::{
    AttachmentSource, DocumentRenderer, FileAttachments, GlyphRasterizer, MemoryAttachments,
    PdfReportWriter, ReportDocument, ReportLayout, TextRasterizer,
};
pub use session::{ExpenseSession, UploadState};
