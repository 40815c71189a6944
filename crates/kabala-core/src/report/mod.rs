//! Report layout and rendering.

mod attachments;
pub mod layout;
pub mod text;
mod writer;

pub use attachments::{decode_attachment, FileAttachments, MemoryAttachments};
pub use layout::{fit_image, format_date, Page, Placement, Primitive, Rect, ReportDocument, ReportLayout};
pub use text::{visual_order, GlyphRasterizer, TextRasterizer};
pub use writer::PdfReportWriter;

use image::DynamicImage;

use crate::error::RenderError;
use crate::models::AttachmentRef;

/// Resolves attachment handles to images when the report is laid out.
pub trait AttachmentSource {
    fn load(&self, attachment: &AttachmentRef) -> Result<DynamicImage, RenderError>;
}

/// Produces a binary document from laid out pages.
pub trait DocumentRenderer {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError>;
}
