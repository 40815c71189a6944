//! PDF output for laid out reports using lopdf.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info, warn};

use crate::error::RenderError;

use super::layout::{Primitive, ReportDocument, ATTACHMENT_ERROR, PX_TO_MM};
use super::text::{visual_order, GlyphRasterizer, TextRasterizer};
use super::DocumentRenderer;

const MM_TO_PT: f32 = 72.0 / 25.4;
const FONT_NAME: &str = "F1";

/// Renders a [`ReportDocument`] to PDF bytes.
///
/// Text goes through the rasterizer when one is set; otherwise it is written
/// with the Helvetica base font, which only covers Latin-1.
pub struct PdfReportWriter {
    rasterizer: Option<Box<dyn TextRasterizer>>,
    jpeg_quality: u8,
}

impl Default for PdfReportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfReportWriter {
    pub fn new() -> Self {
        Self {
            rasterizer: None,
            jpeg_quality: 85,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Box<dyn TextRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Rasterize text with the font shipped with the crate.
    pub fn with_bundled_font(self) -> Result<Self, RenderError> {
        Ok(self.with_rasterizer(Box::new(GlyphRasterizer::bundled()?)))
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Content stream and resources of the page being written.
struct PageBuilder {
    height_pt: f32,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

impl PageBuilder {
    fn new(height_mm: f32) -> Self {
        Self {
            height_pt: height_mm * MM_TO_PT,
            operations: Vec::new(),
            xobjects: Dictionary::new(),
        }
    }

    fn x(&self, mm: f32) -> f32 {
        mm * MM_TO_PT
    }

    /// PDF space grows upwards from the bottom edge.
    fn y(&self, mm: f32) -> f32 {
        self.height_pt - mm * MM_TO_PT
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let ops = [
            Operation::new("w", vec![0.6.into()]),
            Operation::new("m", vec![self.x(x1).into(), self.y(y1).into()]),
            Operation::new("l", vec![self.x(x2).into(), self.y(y2).into()]),
            Operation::new("S", vec![]),
        ];
        self.operations.extend(ops);
    }

    /// Draw an XObject into the box whose top-left corner is at (`x`, `y`).
    fn place(&mut self, id: ObjectId, x: f32, y: f32, width: f32, height: f32) {
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.set(name.as_bytes().to_vec(), id);

        let ops = [
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (width * MM_TO_PT).into(),
                    0.into(),
                    0.into(),
                    (height * MM_TO_PT).into(),
                    self.x(x).into(),
                    self.y(y + height).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ];
        self.operations.extend(ops);
    }

    fn base_font_text(&mut self, text: &str, right_x: f32, y: f32, size: f32) {
        let font_pt = size * 0.75;
        let approx_width_pt = text.chars().count() as f32 * font_pt * 0.5;
        let baseline = y + (size + 10.0) * PX_TO_MM * 0.7;

        let ops = [
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FONT_NAME.into(), font_pt.into()]),
            Operation::new(
                "Td",
                vec![(self.x(right_x) - approx_width_pt).into(), self.y(baseline).into()],
            ),
            Operation::new("Tj", vec![Object::String(latin1(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ];
        self.operations.extend(ops);
    }
}

impl PdfReportWriter {
    fn text(
        &self,
        pdf: &mut Document,
        page: &mut PageBuilder,
        text: &str,
        right_x: f32,
        y: f32,
        size: f32,
    ) {
        if text.is_empty() {
            return;
        }

        let Some(rasterizer) = &self.rasterizer else {
            page.base_font_text(&visual_order(text), right_x, y, size);
            return;
        };

        match rasterizer.render_text(text, size) {
            Ok(bitmap) => {
                let scale = PX_TO_MM / rasterizer.oversample();
                let width = bitmap.width() as f32 * scale;
                let height = bitmap.height() as f32 * scale;
                let id = pdf.add_object(raw_rgb_xobject(&bitmap));
                page.place(id, right_x - width, y, width, height);
            }
            Err(e) => {
                warn!("Falling back to base font for {:?}: {}", text, e);
                page.base_font_text(&visual_order(text), right_x, y, size);
            }
        }
    }

    fn jpeg_xobject(&self, image: &DynamicImage) -> Result<Stream, RenderError> {
        let rgb = image.to_rgb8();
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut Cursor::new(&mut data), self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| RenderError::Encode(e.to_string()))?;

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => rgb.width() as i64,
                "Height" => rgb.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            data,
        );
        // Already DCT encoded
        stream.allows_compression = false;
        Ok(stream)
    }
}

impl DocumentRenderer for PdfReportWriter {
    fn render(&self, document: &ReportDocument) -> Result<Vec<u8>, RenderError> {
        let mut pdf = Document::with_version("1.5");
        let pages_id = pdf.new_object_id();
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let media_box = vec![
            0.into(),
            0.into(),
            (document.width_mm * MM_TO_PT).into(),
            (document.height_mm * MM_TO_PT).into(),
        ];

        let mut kids: Vec<Object> = Vec::with_capacity(document.pages.len());

        for (number, page) in document.pages.iter().enumerate() {
            let mut builder = PageBuilder::new(document.height_mm);

            for primitive in &page.primitives {
                match primitive {
                    Primitive::Line { x1, y1, x2, y2 } => builder.line(*x1, *y1, *x2, *y2),
                    Primitive::Text { text, right_x, y, size } => {
                        self.text(&mut pdf, &mut builder, text, *right_x, *y, *size)
                    }
                    Primitive::Image { image, x, y, width, height } => {
                        match self.jpeg_xobject(image) {
                            Ok(stream) => {
                                let id = pdf.add_object(stream);
                                builder.place(id, *x, *y, *width, *height);
                            }
                            Err(e) => {
                                warn!("Page {}: {}", number + 1, e);
                                self.text(&mut pdf, &mut builder, ATTACHMENT_ERROR, x + width, *y, 12.0);
                            }
                        }
                    }
                }
            }

            let content = Content {
                operations: builder.operations,
            };
            let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => dictionary! { FONT_NAME => font_id },
                    "XObject" => builder.xobjects,
                },
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        pdf.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if document.rtl {
            catalog.set("ViewerPreferences", dictionary! { "Direction" => "R2L" });
        }
        let catalog_id = pdf.add_object(catalog);
        pdf.trailer.set("Root", catalog_id);
        pdf.compress();

        let mut bytes = Vec::new();
        pdf.save_to(&mut bytes)?;

        info!(
            "Wrote report: {} pages, {} bytes",
            document.pages.len(),
            bytes.len()
        );
        debug!("Text rendering: {}", if self.rasterizer.is_some() { "bitmap" } else { "base font" });
        if self.rasterizer.is_none() {
            let lost = document
                .pages
                .iter()
                .flat_map(|p| p.texts())
                .filter(|t| t.chars().any(|c| c as u32 >= 0x100))
                .count();
            if lost > 0 {
                warn!("{} text runs outside Latin-1 written as '?'; set a font", lost);
            }
        }

        Ok(bytes)
    }
}

/// Uncompressed RGB image XObject; compressed with the rest of the document.
fn raw_rgb_xobject(bitmap: &RgbaImage) -> Stream {
    let rgb = DynamicImage::ImageRgba8(bitmap.clone()).to_rgb8();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => rgb.width() as i64,
            "Height" => rgb.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    )
}

/// Latin-1 bytes for the base font; other characters become '?'.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect()
}
