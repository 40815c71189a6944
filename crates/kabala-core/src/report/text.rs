//! Rasterizing right-to-left text.
//!
//! PDF base fonts cannot shape Hebrew, so text is drawn into a bitmap in
//! visual order and placed on the page as an image.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::error::RenderError;

/// Turns a line of text into a bitmap.
pub trait TextRasterizer {
    /// Render `text` at `size` CSS pixels on a white background.
    ///
    /// The bitmap is the text width plus 20 px wide and the font size plus
    /// 10 px high, multiplied by [`oversample`](Self::oversample).
    fn render_text(&self, text: &str, size: f32) -> Result<RgbaImage, RenderError>;

    /// Bitmap pixels per CSS pixel.
    fn oversample(&self) -> f32 {
        1.0
    }
}

/// DejaVu Sans, which covers Hebrew, Latin and the shekel sign.
/// License in `fonts/LICENSE-DejaVu.txt`.
static BUNDLED_FONT: &[u8] = include_bytes!("../../fonts/DejaVuSans.ttf");

/// [`TextRasterizer`] backed by a TrueType/OpenType font.
pub struct GlyphRasterizer {
    font: FontVec,
    oversample: f32,
}

impl GlyphRasterizer {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(data).map_err(|e| RenderError::Font(e.to_string()))?;
        Ok(Self {
            font,
            oversample: 4.0,
        })
    }

    /// The font shipped with the crate, used when none is configured.
    pub fn bundled() -> Result<Self, RenderError> {
        Self::from_bytes(BUNDLED_FONT.to_vec())
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn with_oversample(mut self, oversample: f32) -> Self {
        self.oversample = oversample.max(1.0);
        self
    }
}

impl TextRasterizer for GlyphRasterizer {
    fn render_text(&self, text: &str, size: f32) -> Result<RgbaImage, RenderError> {
        let visual = visual_order(text);
        let os = self.oversample;
        let scale = PxScale::from(size * os);

        let (text_width, _) = text_size(scale, &self.font, &visual);
        let width = text_width + (20.0 * os) as u32;
        let height = ((size + 10.0) * os).ceil() as u32;

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let x = width as i32 - text_width as i32 - (5.0 * os) as i32;
        let y = ((height as f32 - size * os) / 2.0) as i32;
        draw_text_mut(&mut canvas, Rgba([0, 0, 0, 255]), x, y, scale, &self.font, &visual);

        Ok(canvas)
    }

    fn oversample(&self) -> f32 {
        self.oversample
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    /// Strong right-to-left letter.
    R,
    /// Strong left-to-right letter.
    L,
    /// Digit.
    Number,
    /// Whitespace, punctuation, symbols.
    Neutral,
}

fn is_rtl(c: char) -> bool {
    matches!(c, '\u{0590}'..='\u{05FF}' | '\u{0600}'..='\u{06FF}' | '\u{FB1D}'..='\u{FB4F}')
}

fn classify(c: char) -> Class {
    if is_rtl(c) {
        Class::R
    } else if c.is_ascii_digit() {
        Class::Number
    } else if c.is_alphanumeric() {
        Class::L
    } else {
        Class::Neutral
    }
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        other => other,
    }
}

/// Reorder a logical right-to-left line into left-to-right visual order.
///
/// A simplified bidi pass for a right-to-left paragraph: numbers (with
/// separators between digits) and Latin words keep their internal order,
/// everything else is reversed and brackets are mirrored. Text without
/// right-to-left letters is returned unchanged.
pub fn visual_order(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if !chars.iter().any(|&c| is_rtl(c)) {
        return text.to_string();
    }

    let mut classes: Vec<Class> = chars.iter().map(|&c| classify(c)).collect();

    // Separators between digits belong to the number
    for i in 1..chars.len().saturating_sub(1) {
        if classes[i] == Class::Neutral
            && matches!(chars[i], '.' | ',' | '/' | ':' | '-')
            && classes[i - 1] == Class::Number
            && classes[i + 1] == Class::Number
        {
            classes[i] = Class::Number;
        }
    }

    // Numbers following a Latin word read as part of it
    let mut last_strong = Class::R;
    for class in classes.iter_mut() {
        match *class {
            Class::R | Class::L => last_strong = *class,
            Class::Number if last_strong == Class::L => *class = Class::L,
            _ => {}
        }
    }

    // Neutrals take L only between two left-to-right neighbours
    let resolved: Vec<Class> = (0..chars.len())
        .map(|i| {
            if classes[i] != Class::Neutral {
                return classes[i];
            }
            let before = classes[..i].iter().rev().find(|c| **c != Class::Neutral);
            let after = classes[i + 1..].iter().find(|c| **c != Class::Neutral);
            match (before, after) {
                (Some(Class::L), Some(Class::L)) => Class::L,
                _ => Class::R,
            }
        })
        .collect();

    // Group into runs; L and Number both read left-to-right
    let mut runs: Vec<(bool, Vec<char>)> = Vec::new();
    for (&c, &class) in chars.iter().zip(&resolved) {
        let ltr = class != Class::R;
        match runs.last_mut() {
            Some((run_ltr, run)) if *run_ltr == ltr => run.push(c),
            _ => runs.push((ltr, vec![c])),
        }
    }

    runs.iter()
        .rev()
        .flat_map(|(ltr, run)| {
            if *ltr {
                run.clone()
            } else {
                run.iter().rev().map(|&c| mirror(c)).collect()
            }
        })
        .collect()
}
