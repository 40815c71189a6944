//! Regex patterns for receipt field extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// Amount with optional thousands separators and optional two decimals.
const AMOUNT: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+(?:\.\d{2})?)";

/// Optional currency marker between a label and its amount.
const CURRENCY: &str = r#"(?:₪|ש["״׳']?ח|NIS|ILS)?"#;

lazy_static! {
    // "סה"כ" in its common OCR spellings, "סך הכל", or "total"
    pub static ref TOTAL_LABELED: Regex = Regex::new(&format!(
        r#"(?i)(?:סה["״׳']{{0,2}}כ|סך\s+הכו?ל|\btotal\b)(?:\s+לתשלום)?\s*:?\s*{CURRENCY}\s*{AMOUNT}"#
    )).unwrap();

    pub static ref SUM_TO_PAY: Regex = Regex::new(&format!(
        r"(?i)(?:(?:סכום\s+)?לתשלום|\bamount\s+due\b|\bto\s+pay\b)\s*:?\s*{CURRENCY}\s*{AMOUNT}"
    )).unwrap();

    // Standalone numbers only: neither side may touch a digit or a dot
    // followed by a digit, so no part of a dotted date (05.03.24) matches.
    pub static ref BARE_DECIMAL: Regex = Regex::new(
        r"(?:^|[^\d.])(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})(?:[^\d.]|\.\D|\.$|$)"
    ).unwrap();

    pub static ref BARE_NUMBER: Regex = Regex::new(
        r"(?:^|[^\d.])(\d+(?:\.\d{2})?)(?:[^\d.]|\.\D|\.$|$)"
    ).unwrap();

    // Dates
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();
}
