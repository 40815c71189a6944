//! Total amount extraction from recognized receipt text.

use regex::Regex;
use tracing::debug;

use super::patterns::{BARE_DECIMAL, BARE_NUMBER, SUM_TO_PAY, TOTAL_LABELED};
use super::{ExtractionMatch, FieldExtractor};

/// A single matcher in the priority list.
#[derive(Clone, Copy)]
pub struct AmountMatcher {
    /// Short name used in logs.
    pub name: &'static str,
    /// Confidence attached to a hit.
    pub confidence: f32,
    find: fn(&str) -> Option<(String, usize, usize)>,
}

impl AmountMatcher {
    /// Run this matcher alone.
    pub fn find(&self, text: &str) -> Option<ExtractionMatch<String>> {
        (self.find)(text).map(|(value, start, end)| {
            ExtractionMatch::new(normalize(&value), self.confidence, &text[start..end])
                .with_position(start, end)
        })
    }
}

/// Matchers in priority order: labeled total, sum to pay, bare decimal, bare number.
pub const MATCHERS: [AmountMatcher; 4] = [
    AmountMatcher {
        name: "total",
        confidence: 0.95,
        find: find_total,
    },
    AmountMatcher {
        name: "sum_to_pay",
        confidence: 0.9,
        find: find_sum_to_pay,
    },
    AmountMatcher {
        name: "bare_decimal",
        confidence: 0.5,
        find: find_bare_decimal,
    },
    AmountMatcher {
        name: "bare_number",
        confidence: 0.3,
        find: find_bare_number,
    },
];

/// Amount field extractor running [`MATCHERS`] in order.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = String;

    fn extract(&self, text: &str) -> Option<ExtractionMatch<String>> {
        for matcher in &MATCHERS {
            if let Some(found) = matcher.find(text) {
                debug!("Amount {:?} found by {} matcher", found.value, matcher.name);
                return Some(found);
            }
        }
        None
    }
}

/// Find the most likely total amount in raw OCR text.
///
/// Returns an empty string when nothing matches; callers must show that as
/// a blank amount awaiting manual entry.
pub fn extract_amount(text: &str) -> String {
    AmountExtractor::new()
        .extract(text)
        .map(|m| m.value)
        .unwrap_or_default()
}

fn find_total(text: &str) -> Option<(String, usize, usize)> {
    first_group(&TOTAL_LABELED, text)
}

fn find_sum_to_pay(text: &str) -> Option<(String, usize, usize)> {
    first_group(&SUM_TO_PAY, text)
}

fn find_bare_decimal(text: &str) -> Option<(String, usize, usize)> {
    first_group(&BARE_DECIMAL, text)
}

fn find_bare_number(text: &str) -> Option<(String, usize, usize)> {
    first_group(&BARE_NUMBER, text)
}

/// First capturing group of the first match, or the whole match when the
/// pattern has no group.
fn first_group(re: &Regex, text: &str) -> Option<(String, usize, usize)> {
    let caps = re.captures(text)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    Some((m.as_str().to_string(), m.start(), m.end()))
}

/// Drop thousands separators so the value parses as a plain decimal.
fn normalize(value: &str) -> String {
    value.replace(',', "")
}
