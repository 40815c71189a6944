//! Date extraction for receipts.

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_YMD};
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor. Day-first numeric dates take precedence, as
/// printed on Israeli receipts.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, text: &str) -> Option<ExtractionMatch<NaiveDate>> {
        self.candidates(text).into_iter().next()
    }
}

impl DateExtractor {
    /// Every valid date in `text`, in order of appearance.
    pub fn candidates(&self, text: &str) -> Vec<ExtractionMatch<NaiveDate>> {
        let mut results = Vec::new();

        // DD.MM.YYYY or DD/MM/YYYY or DD-MM-YY
        for caps in DATE_DMY.captures_iter(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year = parse_year(&caps[3]);

            if let (Some(date), Some(full)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                results.push(
                    ExtractionMatch::new(date, 0.9, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        // YYYY-MM-DD
        for caps in DATE_YMD.captures_iter(text) {
            let year: i32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let day: u32 = caps[3].parse().unwrap_or(0);

            if let (Some(date), Some(full)) = (NaiveDate::from_ymd_opt(year, month, day), caps.get(0)) {
                if results.iter().any(|r| r.value == date) {
                    continue;
                }
                results.push(
                    ExtractionMatch::new(date, 0.9, full.as_str())
                        .with_position(full.start(), full.end()),
                );
            }
        }

        results.sort_by_key(|m| m.position.map(|(start, _)| start).unwrap_or(usize::MAX));
        results
    }
}

/// First plausible date printed on the receipt.
pub fn extract_date(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().extract(text).map(|m| m.value)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: 00-50 is 2000s, 51-99 is 1900s
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}
