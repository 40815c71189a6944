//! Upload-and-recognize cycle and report export for one employee.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use image::DynamicImage;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{KabalaError, Result, SessionError, UploadError};
use crate::extract::{extract_amount, extract_date};
use crate::mail::MailDraft;
use crate::models::config::KabalaConfig;
use crate::models::{AttachmentRef, EmployeeDetails, ExpenseEntry, ExpenseField, ExpenseStore};
use crate::ocr::OcrEngine;
use crate::pdf::{PdfExtractor, MIN_TEXT_LENGTH};
use crate::report::{AttachmentSource, DocumentRenderer, ReportLayout};

/// Where the session is in the upload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading,
    Recognizing,
    /// The last upload produced the entry at this index.
    Appended(usize),
    /// The last upload was abandoned with this message.
    Failed(String),
}

impl UploadState {
    /// An upload is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Recognizing)
    }
}

/// Kinds of receipt file accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReceiptKind {
    Image,
    Pdf,
}

/// Expense session: employee details, the entry store and the upload state.
///
/// Only one upload may be in flight at a time. A failed upload leaves the
/// session in [`UploadState::Failed`] without touching the store; the next
/// upload clears it.
#[derive(Debug, Clone)]
pub struct ExpenseSession {
    employee: EmployeeDetails,
    store: ExpenseStore,
    state: UploadState,
    config: KabalaConfig,
}

impl ExpenseSession {
    pub fn new(employee: EmployeeDetails, config: KabalaConfig) -> Self {
        let store = ExpenseStore::new().with_max_description_len(config.extraction.max_description_len);
        Self::with_store(employee, store, config)
    }

    /// Resume a session over previously collected entries.
    pub fn with_store(employee: EmployeeDetails, store: ExpenseStore, config: KabalaConfig) -> Self {
        Self {
            employee,
            store,
            state: UploadState::Idle,
            config,
        }
    }

    pub fn employee(&self) -> &EmployeeDetails {
        &self.employee
    }

    pub fn set_employee(&mut self, employee: EmployeeDetails) {
        self.employee = employee;
    }

    pub fn config(&self) -> &KabalaConfig {
        &self.config
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Message of the most recent failed upload, cleared by the next start.
    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            UploadState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Dismiss a failure without starting another upload.
    pub fn clear_failure(&mut self) {
        if matches!(self.state, UploadState::Failed(_)) {
            self.state = UploadState::Idle;
        }
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    pub fn into_store(self) -> ExpenseStore {
        self.store
    }

    pub fn entries(&self) -> &[ExpenseEntry] {
        self.store.as_slice()
    }

    pub fn total(&self) -> Decimal {
        self.store.total()
    }

    /// Edit one field of an entry; `false` when `index` is out of range.
    pub fn update(&mut self, index: usize, field: ExpenseField, value: &str) -> bool {
        self.store.update(index, field, value)
    }

    pub fn start_upload(&mut self) -> std::result::Result<(), SessionError> {
        if self.state.is_busy() {
            return Err(SessionError::Busy);
        }
        self.state = UploadState::Uploading;
        Ok(())
    }

    /// The file is read; text recognition is starting.
    pub fn begin_recognition(&mut self) -> std::result::Result<(), SessionError> {
        match self.state {
            UploadState::Uploading | UploadState::Recognizing => {
                self.state = UploadState::Recognizing;
                Ok(())
            }
            _ => Err(SessionError::NotUploading),
        }
    }

    /// Append an entry for the recognized `raw_text` and return its index.
    ///
    /// The amount is blank when no total is found; the user fills it in.
    pub fn complete_upload(
        &mut self,
        raw_text: &str,
        attachment: Option<AttachmentRef>,
    ) -> std::result::Result<usize, SessionError> {
        self.complete_upload_on(raw_text, attachment, Local::now().date_naive())
    }

    /// [`complete_upload`](Self::complete_upload) with an explicit current date.
    pub fn complete_upload_on(
        &mut self,
        raw_text: &str,
        attachment: Option<AttachmentRef>,
        today: NaiveDate,
    ) -> std::result::Result<usize, SessionError> {
        if !self.state.is_busy() {
            return Err(SessionError::NotUploading);
        }

        let amount = extract_amount(raw_text);
        let date = if self.config.extraction.detect_date {
            extract_date(raw_text).unwrap_or(today)
        } else {
            today
        };

        if amount.is_empty() {
            warn!("No amount found in recognized text ({} chars)", raw_text.len());
        }

        let mut entry = ExpenseEntry::new(amount, date);
        if let Some(attachment) = attachment {
            entry = entry.with_attachment(attachment);
        }

        let index = self.store.append(entry);
        self.state = UploadState::Appended(index);
        info!("Added expense #{} ({} entries)", index + 1, self.store.len());
        Ok(index)
    }

    /// Abandon the upload in flight. Nothing is appended.
    pub fn fail_upload(&mut self, error: impl fmt::Display) {
        warn!("Upload failed: {}", error);
        self.state = UploadState::Failed(error.to_string());
    }

    /// Read a receipt file, recognize it and append the resulting entry.
    ///
    /// The file's absolute path becomes the entry's attachment handle, so
    /// the draft can be exported from any working directory.
    pub fn process_upload(&mut self, path: &Path, engine: &dyn OcrEngine) -> Result<usize> {
        self.start_upload()?;

        match self.recognize_file(path, engine) {
            Ok(text) => {
                let attachment = AttachmentRef::new(absolute_handle(path).to_string_lossy());
                Ok(self.complete_upload(&text, Some(attachment))?)
            }
            Err(e) => {
                self.fail_upload(&e);
                Err(e)
            }
        }
    }

    fn recognize_file(&mut self, path: &Path, engine: &dyn OcrEngine) -> Result<String> {
        if !path.is_file() {
            return Err(UploadError::NotFound(path.display().to_string()).into());
        }

        let kind = receipt_kind(path)?;
        let data = std::fs::read(path).map_err(|e| unreadable(path, e))?;
        info!("Uploading {} ({} bytes)", path.display(), data.len());

        self.begin_recognition()?;

        let image = match kind {
            ReceiptKind::Image => image::load_from_memory(&data).map_err(|e| unreadable(path, e))?,
            ReceiptKind::Pdf => {
                let pdf = PdfExtractor::load(&data)?;
                match pdf.extract_text() {
                    Ok(text) if text.trim().len() >= MIN_TEXT_LENGTH => {
                        debug!("Using embedded PDF text ({} chars)", text.len());
                        return Ok(text);
                    }
                    Ok(_) => debug!("PDF has no usable text layer, running OCR"),
                    Err(e) => debug!("PDF text extraction failed, running OCR: {}", e),
                }
                pdf.first_image(1)?
            }
        };

        self.recognize_image(&image, engine)
    }

    /// Engines do their own preprocessing; the decoded image is passed as is.
    fn recognize_image(&self, image: &DynamicImage, engine: &dyn OcrEngine) -> Result<String> {
        let text = engine.recognize(image, &self.config.ocr.language)?;
        debug!("Recognized {} chars", text.len());
        Ok(text)
    }

    /// Lay out and render the report.
    pub fn export(
        &self,
        attachments: &dyn AttachmentSource,
        renderer: &dyn DocumentRenderer,
    ) -> Result<Vec<u8>> {
        let layout = ReportLayout::from_config(&self.config.report);
        let document = layout.render(&self.employee, self.entries(), attachments);
        let bytes = renderer.render(&document)?;

        info!(
            "Exported report for {}: {} entries, total {}",
            self.employee.name,
            self.store.len(),
            self.total()
        );
        Ok(bytes)
    }

    /// Render the report and write it to `path`.
    pub fn export_to(
        &self,
        path: &Path,
        attachments: &dyn AttachmentSource,
        renderer: &dyn DocumentRenderer,
    ) -> Result<()> {
        let bytes = self.export(attachments, renderer)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        info!("Saved {}", path.display());
        Ok(())
    }

    /// `mailto:` link announcing the exported report.
    pub fn mail_link(&self) -> String {
        MailDraft::for_report(
            &self.config.mail,
            &self.employee,
            self.total(),
            &self.config.report.currency_symbol,
            &self.config.report.output_file,
        )
        .to_mailto()
    }
}

fn receipt_kind(path: &Path) -> Result<ReceiptKind> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if extension == "pdf" {
        return Ok(ReceiptKind::Pdf);
    }
    if image::ImageFormat::from_extension(&extension).is_some() {
        return Ok(ReceiptKind::Image);
    }
    Err(KabalaError::Upload(UploadError::Unsupported(
        path.display().to_string(),
    )))
}

fn absolute_handle(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn unreadable(path: &Path, reason: impl fmt::Display) -> KabalaError {
    UploadError::Unreadable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::report::{
        AttachmentSource, FileAttachments, MemoryAttachments, Page, PdfReportWriter, Primitive,
        ReportDocument,
    };
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Returns canned text, counting calls and recording the image size.
    struct CannedOcr {
        text: &'static str,
        calls: Cell<usize>,
        seen: Cell<Option<(u32, u32)>>,
    }

    impl CannedOcr {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: Cell::new(0),
                seen: Cell::new(None),
            }
        }
    }

    impl OcrEngine for CannedOcr {
        fn recognize(&self, image: &DynamicImage, language: &str) -> std::result::Result<String, OcrError> {
            assert_eq!(language, "heb");
            self.calls.set(self.calls.get() + 1);
            self.seen.set(Some((image.width(), image.height())));
            Ok(self.text.to_string())
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &DynamicImage, _language: &str) -> std::result::Result<String, OcrError> {
            Err(OcrError::Recognition("engine crashed".to_string()))
        }
    }

    fn session() -> ExpenseSession {
        let employee = EmployeeDetails::new("Dana", "7").unwrap();
        ExpenseSession::new(employee, KabalaConfig::default())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_png(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        DynamicImage::new_rgb8(64, 48).save(&path).unwrap();
        path
    }

    #[test]
    fn test_single_flight() {
        let mut s = session();
        s.start_upload().unwrap();
        assert_eq!(s.start_upload(), Err(SessionError::Busy));

        s.begin_recognition().unwrap();
        assert_eq!(s.start_upload(), Err(SessionError::Busy));

        s.complete_upload_on("סה\"כ 10.00", None, day(2024, 1, 1)).unwrap();
        assert_eq!(s.state(), &UploadState::Appended(0));
        assert!(s.start_upload().is_ok());
    }

    #[test]
    fn test_complete_without_upload_is_rejected() {
        let mut s = session();
        assert_eq!(
            s.complete_upload("סה\"כ 10.00", None),
            Err(SessionError::NotUploading)
        );
        assert_eq!(s.begin_recognition(), Err(SessionError::NotUploading));
        assert!(s.entries().is_empty());
    }

    #[test]
    fn test_failed_upload_appends_nothing() {
        let mut s = session();
        s.start_upload().unwrap();
        s.fail_upload("camera unplugged");

        assert_eq!(
            s.state(),
            &UploadState::Failed("camera unplugged".to_string())
        );
        assert!(!s.state().is_busy());
        assert_eq!(s.last_error(), Some("camera unplugged"));
        assert!(s.entries().is_empty());

        assert!(s.start_upload().is_ok());
        assert_eq!(s.state(), &UploadState::Uploading);
        assert_eq!(s.last_error(), None);
    }

    #[test]
    fn test_failure_can_be_dismissed() {
        let mut s = session();
        s.start_upload().unwrap();
        s.fail_upload("timeout");
        assert_eq!(s.begin_recognition(), Err(SessionError::NotUploading));

        s.clear_failure();
        assert_eq!(s.state(), &UploadState::Idle);
        assert_eq!(s.last_error(), None);
    }

    #[test]
    fn test_entry_uses_receipt_date_or_today() {
        let mut s = session();
        let today = day(2024, 6, 30);

        s.start_upload().unwrap();
        s.complete_upload_on("15/01/2024\nסה\"כ ₪45.90", None, today).unwrap();
        s.start_upload().unwrap();
        s.complete_upload_on("total 3.00", None, today).unwrap();

        assert_eq!(s.entries()[0].amount, "45.90");
        assert_eq!(s.entries()[0].date, "2024-01-15");
        assert_eq!(s.entries()[1].date, "2024-06-30");
    }

    #[test]
    fn test_date_detection_can_be_disabled() {
        let mut config = KabalaConfig::default();
        config.extraction.detect_date = false;
        let mut s = ExpenseSession::new(EmployeeDetails::new("Dana", "7").unwrap(), config);

        s.start_upload().unwrap();
        s.complete_upload_on("15/01/2024 סה\"כ 1.00", None, day(2024, 6, 30)).unwrap();
        assert_eq!(s.entries()[0].date, "2024-06-30");
    }

    #[test]
    fn test_blank_amount_is_not_an_error() {
        let mut s = session();
        s.start_upload().unwrap();
        let index = s.complete_upload_on("תודה ולהתראות", None, day(2024, 1, 1)).unwrap();

        assert_eq!(s.entries()[index].amount, "");
        assert_eq!(s.total(), Decimal::ZERO);
    }

    #[test]
    fn test_total_after_edits() {
        let mut s = session();
        for text in ["סה\"כ 10.00", "nothing here", "סה\"כ 5.50"] {
            s.start_upload().unwrap();
            s.complete_upload_on(text, None, day(2024, 1, 1)).unwrap();
        }
        assert_eq!(crate::models::format_amount(s.total()), "15.50");

        assert!(s.update(1, ExpenseField::Amount, "4.50"));
        assert!(!s.update(9, ExpenseField::Amount, "1.00"));
        assert_eq!(crate::models::format_amount(s.total()), "20.00");
    }

    #[test]
    fn test_process_image_upload() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "receipt.png");
        let ocr = CannedOcr::new("קפה 12.00\nסה\"כ: 31.90");

        let mut s = session();
        let index = s.process_upload(&path, &ocr).unwrap();

        assert_eq!(ocr.calls.get(), 1);
        assert_eq!(s.entries()[index].amount, "31.90");
        let expected = std::fs::canonicalize(&path).unwrap();
        assert_eq!(
            s.entries()[index].attachment.as_ref().map(AttachmentRef::as_str),
            Some(expected.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn test_relative_upload_stores_absolute_handle() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let path = dir.path().join("receipt.png");
        DynamicImage::new_rgb8(64, 48).save(&path).unwrap();
        assert!(path.is_relative());

        let mut s = session();
        s.process_upload(&path, &CannedOcr::new("סה\"כ 4.00")).unwrap();

        let attachment = s.entries()[0].attachment.clone().unwrap();
        assert!(Path::new(attachment.as_str()).is_absolute());
        assert!(FileAttachments.load(&attachment).is_ok());
    }

    #[test]
    fn test_engine_receives_decoded_image_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.png");
        DynamicImage::new_rgb8(3000, 100).save(&path).unwrap();

        let ocr = CannedOcr::new("total 1.00");
        session().process_upload(&path, &ocr).unwrap();

        assert_eq!(ocr.seen.get(), Some((3000, 100)));
    }

    #[test]
    fn test_process_missing_file() {
        let mut s = session();
        let err = s
            .process_upload(Path::new("/no/such/receipt.png"), &CannedOcr::new(""))
            .unwrap_err();

        assert!(matches!(err, KabalaError::Upload(UploadError::NotFound(_))));
        assert!(matches!(s.state(), UploadState::Failed(_)));
    }

    #[test]
    fn test_process_unsupported_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "סה\"כ 10.00").unwrap();

        let err = session().process_upload(&path, &CannedOcr::new("")).unwrap_err();
        assert!(matches!(err, KabalaError::Upload(UploadError::Unsupported(_))));
    }

    #[test]
    fn test_process_corrupt_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let mut s = session();
        let err = s.process_upload(&path, &CannedOcr::new("")).unwrap_err();
        assert!(matches!(err, KabalaError::Upload(UploadError::Unreadable { .. })));
        assert!(s.last_error().is_some());
    }

    #[test]
    fn test_recognition_failure_keeps_session_usable() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "receipt.png");

        let mut s = session();
        let err = s.process_upload(&path, &FailingOcr).unwrap_err();
        assert!(matches!(err, KabalaError::Ocr(OcrError::Recognition(_))));
        assert!(s.entries().is_empty());

        let index = s.process_upload(&path, &CannedOcr::new("total 2.00")).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_process_scanned_pdf_runs_ocr() {
        let dir = TempDir::new().unwrap();
        let scan = Page {
            primitives: vec![Primitive::Image {
                image: DynamicImage::new_rgb8(64, 48),
                x: 20.0,
                y: 40.0,
                width: 60.0,
                height: 45.0,
            }],
        };
        let document = ReportDocument {
            pages: vec![scan],
            width_mm: 210.0,
            height_mm: 297.0,
            rtl: false,
        };
        let pdf_path = dir.path().join("receipt.pdf");
        std::fs::write(&pdf_path, PdfReportWriter::new().render(&document).unwrap()).unwrap();

        let ocr = CannedOcr::new("סה\"כ 8.80");
        let mut s = session();
        s.process_upload(&pdf_path, &ocr).unwrap();

        assert_eq!(ocr.calls.get(), 1);
        assert_eq!(s.entries()[0].amount, "8.80");
        assert!(s.entries()[0].attachment.as_ref().unwrap().is_pdf());
    }

    #[test]
    fn test_export_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("expenses.pdf");

        let mut s = session();
        s.start_upload().unwrap();
        s.complete_upload_on("סה\"כ 10.00", None, day(2024, 1, 1)).unwrap();
        s.export_to(&path, &MemoryAttachments::new(), &PdfReportWriter::new())
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_mail_link_mentions_total() {
        let mut s = session();
        s.start_upload().unwrap();
        s.complete_upload_on("סה\"כ 10.00", None, day(2024, 1, 1)).unwrap();

        let link = s.mail_link();
        assert!(link.starts_with("mailto:?subject="));
        assert!(link.contains("10.00"));
        assert!(link.contains("expenses.pdf"));
    }
}
