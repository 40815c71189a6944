//! WASM bindings for receipt expense reports.
//!
//! OCR runs in the browser (e.g. tesseract.js); the recognized text and the
//! uploaded file are handed to an [`ExpenseForm`], which extracts the amount,
//! keeps the entries and renders the report PDF.

use wasm_bindgen::prelude::*;

use kabala_core::models::config::KabalaConfig;
use kabala_core::models::format_amount;
use kabala_core::ocr::{join_reading_order, TextLine};
use kabala_core::{
    AttachmentRef, EmployeeDetails, ExpenseField, ExpenseSession, GlyphRasterizer,
    MemoryAttachments, PdfReportWriter,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Find the receipt total in recognized text; empty when none is found.
#[wasm_bindgen]
pub fn extract_amount(text: &str) -> String {
    kabala_core::extract_amount(text)
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// The expense form: employee details, entries and uploaded receipts.
#[wasm_bindgen]
pub struct ExpenseForm {
    session: ExpenseSession,
    attachments: MemoryAttachments,
    uploads: usize,
}

#[wasm_bindgen]
impl ExpenseForm {
    /// Start an empty form for the given employee.
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, id: &str) -> Result<ExpenseForm, JsValue> {
        let employee = EmployeeDetails::new(name, id).map_err(js_error)?;
        Ok(Self {
            session: ExpenseSession::new(employee, KabalaConfig::default()),
            attachments: MemoryAttachments::new(),
            uploads: 0,
        })
    }

    pub fn set_employee(&mut self, name: &str, id: &str) -> Result<(), JsValue> {
        let employee = EmployeeDetails::new(name, id).map_err(js_error)?;
        self.session.set_employee(employee);
        Ok(())
    }

    /// Whether an upload is being read or recognized.
    pub fn is_busy(&self) -> bool {
        self.session.state().is_busy()
    }

    /// Fails while another upload is in flight.
    pub fn start_upload(&mut self) -> Result<(), JsValue> {
        self.session.start_upload().map_err(js_error)
    }

    pub fn begin_recognition(&mut self) -> Result<(), JsValue> {
        self.session.begin_recognition().map_err(js_error)
    }

    /// Store the uploaded file and add an entry for its recognized text.
    /// Returns the new entry's index.
    pub fn complete_upload(
        &mut self,
        raw_text: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<usize, JsValue> {
        let handle = format!("{}/{}", self.uploads, file_name);
        let index = self
            .session
            .complete_upload(raw_text, Some(AttachmentRef::new(handle.clone())))
            .map_err(js_error)?;

        self.attachments.insert(handle, data);
        self.uploads += 1;
        Ok(index)
    }

    /// Abandon the upload in flight; nothing is added.
    pub fn fail_upload(&mut self, message: &str) {
        web_sys::console::warn_1(&JsValue::from_str(message));
        self.session.fail_upload(message);
    }

    /// Message of the last failed upload, until the next one starts.
    pub fn last_error(&self) -> Option<String> {
        self.session.last_error().map(str::to_string)
    }

    /// Edit `field` ("amount", "date" or "description") of an entry.
    /// Returns `false` when `index` is out of range.
    pub fn update(&mut self, index: usize, field: &str, value: &str) -> Result<bool, JsValue> {
        let field: ExpenseField = field.parse().map_err(js_error)?;
        Ok(self.session.update(index, field, value))
    }

    pub fn len(&self) -> usize {
        self.session.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.session.entries().is_empty()
    }

    /// Total of the parseable amounts, with two decimals.
    pub fn total(&self) -> String {
        format_amount(self.session.total())
    }

    /// Entries as plain objects `{ amount, date, description, attachment }`.
    pub fn entries(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.session.entries()).map_err(js_error)
    }

    /// Render the report, with the given font bytes or the bundled font.
    pub fn render_pdf(&self, font: Option<Vec<u8>>) -> Result<Vec<u8>, JsValue> {
        let rasterizer = match font {
            Some(font) => GlyphRasterizer::from_bytes(font),
            None => GlyphRasterizer::bundled(),
        }
        .map_err(js_error)?;
        let writer = PdfReportWriter::new()
            .with_jpeg_quality(self.session.config().report.jpeg_quality)
            .with_rasterizer(Box::new(rasterizer));

        self.session
            .export(&self.attachments, &writer)
            .map_err(js_error)
    }

    pub fn mail_link(&self) -> String {
        self.session.mail_link()
    }
}

/// Lines recognized by a browser-side OCR engine, joined in reading order.
#[wasm_bindgen]
#[derive(Default)]
pub struct OcrLines {
    lines: Vec<TextLine>,
}

#[wasm_bindgen]
impl OcrLines {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line with its bounding box in image pixels.
    pub fn add_line(&mut self, text: &str, x0: f32, y0: f32, x1: f32, y1: f32, confidence: f32) {
        self.lines.push(TextLine {
            text: text.to_string(),
            rect: (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
            confidence,
        });
    }

    /// Lines top to bottom, right to left within a row.
    pub fn text(&self) -> String {
        join_reading_order(self.lines.clone())
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_extract_amount() {
        assert_eq!(extract_amount("סה\"כ ₪45.90"), "45.90");
        assert_eq!(extract_amount("אין כאן סכום"), "");
    }

    #[wasm_bindgen_test]
    fn test_form_rejects_blank_employee() {
        assert!(ExpenseForm::new("", "1").is_err());
    }

    #[wasm_bindgen_test]
    fn test_upload_cycle_and_total() {
        let mut form = ExpenseForm::new("Dana", "7").unwrap();

        form.start_upload().unwrap();
        assert!(form.is_busy());
        assert!(form.start_upload().is_err());
        form.begin_recognition().unwrap();
        form.complete_upload("סה\"כ 10.00", "a.png", vec![]).unwrap();

        form.start_upload().unwrap();
        form.fail_upload("network error");
        assert!(!form.is_busy());
        assert_eq!(form.last_error().as_deref(), Some("network error"));
        assert_eq!(form.len(), 1);

        form.start_upload().unwrap();
        form.complete_upload("total 5.50", "b.png", vec![]).unwrap();
        assert_eq!(form.total(), "15.50");

        assert!(form.update(0, "amount", "1.00").unwrap());
        assert!(!form.update(5, "amount", "1.00").unwrap());
        assert!(form.update(0, "colour", "red").is_err());
        assert_eq!(form.total(), "6.50");
    }

    #[wasm_bindgen_test]
    fn test_render_pdf_with_unreadable_attachment() {
        let mut form = ExpenseForm::new("Dana", "7").unwrap();
        form.start_upload().unwrap();
        form.complete_upload("סה\"כ 10.00", "a.png", b"not an image".to_vec())
            .unwrap();

        let pdf = form.render_pdf(None).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[wasm_bindgen_test]
    fn test_ocr_lines_reading_order() {
        let mut lines = OcrLines::new();
        lines.add_line("סה\"כ", 300.0, 100.0, 380.0, 120.0, 0.9);
        lines.add_line("45.90", 50.0, 102.0, 120.0, 122.0, 0.9);
        lines.add_line("קפה", 300.0, 10.0, 360.0, 30.0, 0.9);

        assert_eq!(lines.text(), "קפה\nסה\"כ\n45.90");
    }
}
