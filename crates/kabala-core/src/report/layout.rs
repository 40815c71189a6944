//! Page layout of the reimbursement report.
//!
//! The layout engine only places primitives in millimetres on a page with
//! its origin at the top-left corner. Turning primitives into bytes is the
//! job of a [`DocumentRenderer`](super::DocumentRenderer).

use chrono::NaiveDate;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::models::config::ReportConfig;
use crate::models::{format_amount, total_of, EmployeeDetails, ExpenseEntry};

use super::AttachmentSource;

/// Millimetres per CSS pixel (96 DPI).
pub const PX_TO_MM: f32 = 0.264583;

pub const TITLE: &str = "טופס החזר הוצאות";
pub const NAME_LABEL: &str = "שם";
pub const ID_LABEL: &str = "מספר עובד";
pub const HEADER_DATE: &str = "תאריך";
pub const HEADER_DESCRIPTION: &str = "פירוט";
pub const HEADER_AMOUNT: &str = "סכום";
pub const TOTAL_LABEL: &str = "סה\"כ";
pub const EMPLOYEE_SIGNATURE: &str = "חתימת העובד: _________________";
pub const MANAGER_SIGNATURE: &str = "חתימת מנהל: _________________";
pub const RECEIPT_LABEL: &str = "קבלה מספר";
pub const ATTACHMENT_ERROR: &str = "שגיאה בטעינת הקובץ";

const ROW_HEIGHT: f32 = 10.0;
const BODY_SIZE: f32 = 12.0;
/// Space below the last table rule taken by the total and signature lines.
const FOOTER_HEIGHT: f32 = 47.0;

/// One layout primitive. Coordinates are millimetres from the top-left.
#[derive(Debug, Clone)]
pub enum Primitive {
    /// Right-to-left text whose right edge is at `right_x` and top at `y`.
    Text {
        text: String,
        right_x: f32,
        y: f32,
        size: f32,
    },
    /// Straight rule.
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    /// Raster image drawn into the given box.
    Image {
        image: DynamicImage,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// A page as an ordered list of primitives.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub primitives: Vec<Primitive>,
}

impl Page {
    fn text(&mut self, text: impl Into<String>, right_x: f32, y: f32, size: f32) {
        self.primitives.push(Primitive::Text {
            text: text.into(),
            right_x,
            y,
            size,
        });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.primitives.push(Primitive::Line { x1, y1, x2, y2 });
    }

    /// Text primitives in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Image primitives in drawing order.
    pub fn images(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Image { .. }))
    }
}

/// A laid out, paginated report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub pages: Vec<Page>,
    pub width_mm: f32,
    pub height_mm: f32,
    /// Pages read right-to-left.
    pub rtl: bool,
}

/// Axis-aligned box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Where and how large an image is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Uniform scale applied to the image's natural size.
    pub scale: f32,
}

/// Fit an image of `px_width`×`px_height` pixels into `area`.
///
/// The scale is `min(width_ratio, height_ratio, 1.0)`: aspect ratio is kept,
/// the image never overflows and is never enlarged. The result is centred
/// in both axes.
pub fn fit_image(px_width: u32, px_height: u32, area: Rect) -> Placement {
    let natural_width = px_width as f32 * PX_TO_MM;
    let natural_height = px_height as f32 * PX_TO_MM;

    let width_ratio = area.width / natural_width;
    let height_ratio = area.height / natural_height;
    let scale = width_ratio.min(height_ratio).min(1.0);

    let width = natural_width * scale;
    let height = natural_height * scale;

    Placement {
        x: area.x + (area.width - width) / 2.0,
        y: area.y + (area.height - height) / 2.0,
        width,
        height,
        scale,
    }
}

/// Render an ISO date as dd/mm/yyyy, or return it unchanged when it does
/// not parse.
pub fn format_date(iso: &str) -> String {
    NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

/// Parseable amounts with two decimals; anything else as entered.
fn amount_cell(entry: &ExpenseEntry) -> String {
    entry
        .parsed_amount()
        .map(format_amount)
        .unwrap_or_else(|| entry.amount.clone())
}

/// Report layout engine.
pub struct ReportLayout {
    width: f32,
    height: f32,
    margin: f32,
    currency_symbol: String,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::from_config(&ReportConfig::default())
    }
}

impl ReportLayout {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            width: config.page_width_mm,
            height: config.page_height_mm,
            margin: config.margin_mm,
            currency_symbol: config.currency_symbol.clone(),
        }
    }

    fn left(&self) -> f32 {
        self.margin
    }

    fn right(&self) -> f32 {
        self.width - self.margin
    }

    fn bottom(&self) -> f32 {
        self.height - self.margin
    }

    /// Right edges of the date, description and amount columns.
    fn columns(&self) -> [f32; 3] {
        let right = self.right();
        [right - 20.0, right - 80.0, right - 140.0]
    }

    /// Box available to a receipt image below its page header.
    pub fn attachment_area(&self) -> Rect {
        Rect {
            x: self.margin,
            y: self.margin * 2.0,
            width: self.width - self.margin * 2.0,
            height: self.height - self.margin * 3.0,
        }
    }

    /// Lay out the summary page(s) followed by one page per attachment.
    pub fn render(
        &self,
        employee: &EmployeeDetails,
        entries: &[ExpenseEntry],
        attachments: &dyn AttachmentSource,
    ) -> ReportDocument {
        let mut pages = self.summary_pages(employee, entries);

        for (index, entry) in entries.iter().enumerate() {
            if let Some(page) = self.attachment_page(index, entry, attachments) {
                pages.push(page);
            }
        }

        debug!("Laid out report: {} entries, {} pages", entries.len(), pages.len());

        ReportDocument {
            pages,
            width_mm: self.width,
            height_mm: self.height,
            rtl: true,
        }
    }

    fn summary_pages(&self, employee: &EmployeeDetails, entries: &[ExpenseEntry]) -> Vec<Page> {
        let (left, right) = (self.left(), self.right());
        let [date_x, description_x, amount_x] = self.columns();
        let mut pages = Vec::new();

        let mut page = Page::default();
        page.text(TITLE, right - 40.0, 20.0, 16.0);
        page.text(format!("{}: {}", NAME_LABEL, employee.name), right - 20.0, 40.0, BODY_SIZE);
        page.text(format!("{}: {}", ID_LABEL, employee.id), right - 20.0, 50.0, BODY_SIZE);

        let mut table_top = 65.0;
        let mut y = self.table_header(&mut page, table_top);

        for entry in entries {
            if y + ROW_HEIGHT / 2.0 > self.bottom() {
                self.close_table(&mut page, table_top, y);
                pages.push(std::mem::take(&mut page));
                table_top = self.margin;
                y = self.table_header(&mut page, table_top);
            }

            page.line(left, y - 5.0, right, y - 5.0);
            page.text(format_date(&entry.date), date_x, y - 3.0, BODY_SIZE);
            page.text(entry.description.clone(), description_x, y - 3.0, BODY_SIZE);
            page.text(amount_cell(entry), amount_x, y - 3.0, BODY_SIZE);
            y += ROW_HEIGHT;
        }

        self.close_table(&mut page, table_top, y);

        if y + FOOTER_HEIGHT > self.bottom() {
            pages.push(std::mem::take(&mut page));
            y = self.margin;
        }

        let total = format_amount(total_of(entries));
        page.text(
            format!("{}: {} {}", TOTAL_LABEL, total, self.currency_symbol),
            right - 20.0,
            y + 7.0,
            BODY_SIZE,
        );
        page.text(EMPLOYEE_SIGNATURE, right - 70.0, y + 30.0, BODY_SIZE);
        page.text(MANAGER_SIGNATURE, right - 70.0, y + 40.0, BODY_SIZE);
        pages.push(page);

        pages
    }

    /// Draw the header row and return the anchor of the first body row.
    fn table_header(&self, page: &mut Page, top: f32) -> f32 {
        let (left, right) = (self.left(), self.right());
        let [date_x, description_x, amount_x] = self.columns();
        let y = top + 5.0;

        page.line(left, top, right, top);
        page.text(HEADER_DATE, date_x, y - 3.0, BODY_SIZE);
        page.text(HEADER_DESCRIPTION, description_x, y - 3.0, BODY_SIZE);
        page.text(HEADER_AMOUNT, amount_x, y - 3.0, BODY_SIZE);
        page.line(left, y + 2.0, right, y + 2.0);

        y + ROW_HEIGHT
    }

    /// Bottom rule and column rules of the table.
    fn close_table(&self, page: &mut Page, top: f32, y: f32) {
        let (left, right) = (self.left(), self.right());
        let bottom = y - 5.0;

        page.line(left, bottom, right, bottom);
        for x in [left, right, right - 40.0, right - 100.0] {
            page.line(x, top, x, bottom);
        }
    }

    fn attachment_page(
        &self,
        index: usize,
        entry: &ExpenseEntry,
        attachments: &dyn AttachmentSource,
    ) -> Option<Page> {
        let attachment = entry.attachment.as_ref()?;
        let right = self.right();
        let mut page = Page::default();

        page.text(
            format!("{} {} - {}", RECEIPT_LABEL, index + 1, format_date(&entry.date)),
            right - 40.0,
            20.0,
            14.0,
        );

        match attachments.load(attachment) {
            Ok(image) => {
                let (px_width, px_height) = image.dimensions();
                let placement = fit_image(px_width, px_height, self.attachment_area());
                debug!(
                    "Receipt #{} {}x{} px scaled by {:.3}",
                    index + 1,
                    px_width,
                    px_height,
                    placement.scale
                );
                page.primitives.push(Primitive::Image {
                    image,
                    x: placement.x,
                    y: placement.y,
                    width: placement.width,
                    height: placement.height,
                });
            }
            Err(e) => {
                warn!("Receipt #{} could not be loaded: {}", index + 1, e);
                page.text(ATTACHMENT_ERROR, right - 40.0, self.margin * 2.0, BODY_SIZE);
            }
        }

        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::models::AttachmentRef;
    use crate::report::MemoryAttachments;
    use pretty_assertions::assert_eq;

    fn employee() -> EmployeeDetails {
        EmployeeDetails::new("דנה לוי", "4711").unwrap()
    }

    fn entry(amount: &str, description: &str) -> ExpenseEntry {
        ExpenseEntry::new(amount, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            .with_description(description)
    }

    struct NoAttachments;

    impl AttachmentSource for NoAttachments {
        fn load(&self, attachment: &AttachmentRef) -> Result<DynamicImage, RenderError> {
            Err(RenderError::Attachment(attachment.to_string(), "missing".to_string()))
        }
    }

    #[test]
    fn test_scale_is_min_of_ratios() {
        let area = Rect { x: 20.0, y: 40.0, width: 170.0, height: 237.0 };
        let p = fit_image(4000, 3000, area);

        let natural_w = 4000.0 * PX_TO_MM;
        let natural_h = 3000.0 * PX_TO_MM;
        let expected = (170.0 / natural_w).min(237.0 / natural_h).min(1.0);

        assert!((p.scale - expected).abs() < 1e-6);
        assert!(p.scale <= 1.0);
        assert!((p.width / p.height - 4.0 / 3.0).abs() < 1e-4);
        assert!((p.width - 170.0).abs() < 1e-3);
        assert!(p.height <= 237.0);
        // Centred vertically, flush horizontally
        assert!((p.x - 20.0).abs() < 1e-3);
        assert!((p.y - (40.0 + (237.0 - p.height) / 2.0)).abs() < 1e-4);
    }

    #[test]
    fn test_tall_image_limited_by_height() {
        let area = Rect { x: 20.0, y: 40.0, width: 170.0, height: 237.0 };
        let p = fit_image(1000, 5000, area);

        assert!((p.height - 237.0).abs() < 1e-3);
        assert!(p.width < 170.0);
        assert!((p.x + p.width / 2.0 - 105.0).abs() < 1e-3);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let area = Rect { x: 20.0, y: 40.0, width: 170.0, height: 237.0 };
        let p = fit_image(200, 100, area);

        assert_eq!(p.scale, 1.0);
        assert!((p.width - 200.0 * PX_TO_MM).abs() < 1e-4);
        assert!((p.x + p.width / 2.0 - 105.0).abs() < 1e-3);
        assert!((p.y + p.height / 2.0 - (40.0 + 237.0 / 2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05"), "05/03/2024");
        assert_eq!(format_date("yesterday"), "yesterday");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn test_summary_rows_follow_store_order_and_total() {
        let entries = vec![
            entry("10.00", "מונית"),
            entry("", "חניה"),
            entry("5.50", "קפה"),
        ];
        let doc = ReportLayout::default().render(&employee(), &entries, &NoAttachments);

        assert_eq!(doc.pages.len(), 1);
        assert!(doc.rtl);

        let texts: Vec<&str> = doc.pages[0].texts().collect();
        let descriptions: Vec<&str> = texts
            .iter()
            .copied()
            .filter(|t| ["מונית", "חניה", "קפה"].contains(t))
            .collect();
        assert_eq!(descriptions, vec!["מונית", "חניה", "קפה"]);

        assert!(texts.contains(&"סה\"כ: 15.50 ₪"));
        assert!(texts.contains(&"שם: דנה לוי"));
        assert!(texts.contains(&"מספר עובד: 4711"));
        assert!(texts.contains(&"05/03/2024"));
        assert!(texts.contains(&EMPLOYEE_SIGNATURE));
        assert!(texts.contains(&MANAGER_SIGNATURE));
    }

    #[test]
    fn test_blank_amount_rendered_as_entered() {
        let entries = vec![entry("", "חניה"), entry("abc", "שונות")];
        let doc = ReportLayout::default().render(&employee(), &entries, &NoAttachments);
        let texts: Vec<&str> = doc.pages[0].texts().collect();

        assert!(texts.contains(&""));
        assert!(texts.contains(&"abc"));
        assert!(texts.contains(&"סה\"כ: 0.00 ₪"));
    }

    #[test]
    fn test_amount_cells_have_two_decimals() {
        let entries = vec![entry("12", "מונית"), entry("12.5", "קפה"), entry("7.25", "חניה")];
        let doc = ReportLayout::default().render(&employee(), &entries, &NoAttachments);
        let texts: Vec<&str> = doc.pages[0].texts().collect();

        assert!(texts.contains(&"12.00"));
        assert!(texts.contains(&"12.50"));
        assert!(texts.contains(&"7.25"));
        assert!(!texts.contains(&"12"));
        assert!(!texts.contains(&"12.5"));
        assert!(texts.contains(&"סה\"כ: 31.75 ₪"));
    }

    #[test]
    fn test_long_tables_continue_on_next_page() {
        let entries: Vec<ExpenseEntry> = (0..40).map(|i| entry("1.00", &format!("{}", i))).collect();
        let doc = ReportLayout::default().render(&employee(), &entries, &NoAttachments);

        assert!(doc.pages.len() >= 2);
        // Header repeated on the continuation page
        assert!(doc.pages[1].texts().any(|t| t == HEADER_DATE));
        // Nothing is placed below the bottom margin
        for page in &doc.pages {
            for p in &page.primitives {
                if let Primitive::Text { y, .. } = p {
                    assert!(*y < 297.0 - 20.0);
                }
            }
        }
        let last = doc.pages.last().unwrap();
        assert!(last.texts().any(|t| t == "סה\"כ: 40.00 ₪"));
    }

    #[test]
    fn test_attachment_page_per_receipt() {
        let mut attachments = MemoryAttachments::new();
        let mut png = Vec::new();
        DynamicImage::new_rgb8(800, 600)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        attachments.insert("a.png", png);

        let entries = vec![
            entry("1.00", "").with_attachment(AttachmentRef::new("a.png")),
            entry("2.00", ""),
            entry("3.00", "").with_attachment(AttachmentRef::new("missing.png")),
        ];
        let doc = ReportLayout::default().render(&employee(), &entries, &attachments);

        assert_eq!(doc.pages.len(), 3);

        let first: Vec<&str> = doc.pages[1].texts().collect();
        assert_eq!(first, vec!["קבלה מספר 1 - 05/03/2024"]);
        match doc.pages[1].images().next() {
            Some(Primitive::Image { x, y, width, height, .. }) => {
                assert!(*x >= 20.0 - 1e-3 && x + width <= 190.0 + 1e-3);
                assert!(*y >= 40.0 - 1e-3 && y + height <= 277.0 + 1e-3);
            }
            _ => panic!("expected an image on the attachment page"),
        }

        let failed: Vec<&str> = doc.pages[2].texts().collect();
        assert_eq!(failed, vec!["קבלה מספר 3 - 05/03/2024", ATTACHMENT_ERROR]);
        assert_eq!(doc.pages[2].images().count(), 0);
    }
}
