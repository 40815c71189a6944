//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the kabala pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KabalaConfig {
    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Receipt field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Report layout and output configuration.
    pub report: ReportConfig,

    /// Mail handoff configuration.
    pub mail: MailConfig,
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Language hint handed to the OCR engine.
    pub language: String,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Keep `[UNK]` tokens in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "heb".to_string(),
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            dictionary: "dict.txt".to_string(),
            max_image_size: 2048,
            keep_unk: false,
        }
    }
}

/// Receipt field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Use a date printed on the receipt instead of today's date.
    pub detect_date: bool,

    /// Maximum description length in characters.
    pub max_description_len: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            detect_date: true,
            max_description_len: 30,
        }
    }
}

/// Report layout and output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Page width in millimetres.
    pub page_width_mm: f32,

    /// Page height in millimetres.
    pub page_height_mm: f32,

    /// Horizontal margin in millimetres.
    pub margin_mm: f32,

    /// TrueType/OpenType font used to rasterize text; the bundled
    /// DejaVu Sans when unset.
    pub font_path: Option<PathBuf>,

    /// Currency symbol printed after the total.
    pub currency_symbol: String,

    /// Output file name.
    pub output_file: String,

    /// JPEG quality for embedded receipt images (1-100).
    pub jpeg_quality: u8,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_mm: 20.0,
            font_path: None,
            currency_symbol: "₪".to_string(),
            output_file: "expenses.pdf".to_string(),
            jpeg_quality: 85,
        }
    }
}

/// Mail compose handoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Default recipient address (may be empty).
    pub recipient: String,

    /// Subject line prefix.
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            subject: "דוח החזר הוצאות".to_string(),
        }
    }
}

impl KabalaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.ocr.model_dir.join(model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: KabalaConfig =
            serde_json::from_str(r#"{"report": {"margin_mm": 15.0}}"#).unwrap();

        assert_eq!(config.report.margin_mm, 15.0);
        assert_eq!(config.report.output_file, "expenses.pdf");
        assert_eq!(config.ocr.language, "heb");
        assert_eq!(config.extraction.max_description_len, 30);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = KabalaConfig::default();
        config.mail.recipient = "finance@example.com".to_string();
        config.save(&path).unwrap();

        let loaded = KabalaConfig::from_file(&path).unwrap();
        assert_eq!(loaded.mail.recipient, "finance@example.com");
        assert_eq!(loaded.model_path("det.onnx"), PathBuf::from("models/det.onnx"));
    }
}
