//! Employee details and the ordered expense record store.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SessionError;

/// Default maximum description length, matching the form field limit.
pub const MAX_DESCRIPTION_LEN: usize = 30;

/// Identity of the employee filing the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeDetails {
    /// Full name.
    pub name: String,
    /// Employee number.
    pub id: String,
}

impl EmployeeDetails {
    /// Create validated employee details. Both fields must be non-blank.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Result<Self, SessionError> {
        let name = name.into().trim().to_string();
        let id = id.into().trim().to_string();

        if name.is_empty() {
            return Err(SessionError::MissingEmployeeField("name"));
        }
        if id.is_empty() {
            return Err(SessionError::MissingEmployeeField("id"));
        }

        Ok(Self { name, id })
    }
}

/// Opaque handle to an uploaded receipt, resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the handle names a PDF document.
    pub fn is_pdf(&self) -> bool {
        self.0.to_lowercase().ends_with(".pdf")
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single expense line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    /// Amount as entered or recognized; may be blank or unparseable.
    pub amount: String,

    /// ISO-8601 date (YYYY-MM-DD).
    pub date: String,

    /// Free-text description.
    pub description: String,

    /// Uploaded receipt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
}

impl ExpenseEntry {
    pub fn new(amount: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            amount: amount.into(),
            date: date.format("%Y-%m-%d").to_string(),
            description: String::new(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = truncate_chars(&description.into(), MAX_DESCRIPTION_LEN);
        self
    }

    /// Parsed amount, or `None` when it does not count towards the total.
    pub fn parsed_amount(&self) -> Option<Decimal> {
        parse_amount(&self.amount)
    }

    /// Parsed date, or `None` when the stored string is not ISO-8601.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()
    }
}

/// Editable fields of an [`ExpenseEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseField {
    Amount,
    Date,
    Description,
}

impl FromStr for ExpenseField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amount" => Ok(Self::Amount),
            "date" => Ok(Self::Date),
            "description" => Ok(Self::Description),
            other => Err(format!("unknown expense field: {}", other)),
        }
    }
}

impl fmt::Display for ExpenseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Amount => "amount",
            Self::Date => "date",
            Self::Description => "description",
        };
        f.write_str(name)
    }
}

/// Ordered sequence of expense entries, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseStore {
    entries: Vec<ExpenseEntry>,
    #[serde(default = "default_description_len")]
    max_description_len: usize,
}

fn default_description_len() -> usize {
    MAX_DESCRIPTION_LEN
}

impl Default for ExpenseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_description_len: MAX_DESCRIPTION_LEN,
        }
    }

    pub fn with_max_description_len(mut self, len: usize) -> Self {
        self.max_description_len = len;
        self
    }

    /// Append an entry and return its index.
    pub fn append(&mut self, mut entry: ExpenseEntry) -> usize {
        entry.description = truncate_chars(&entry.description, self.max_description_len);
        self.entries.push(entry);
        debug!("Appended expense entry #{}", self.entries.len());
        self.entries.len() - 1
    }

    /// Set one field of the entry at `index`.
    ///
    /// Returns `false` without touching the store when `index` is out of range.
    pub fn update(&mut self, index: usize, field: ExpenseField, value: &str) -> bool {
        let max_len = self.max_description_len;
        let Some(entry) = self.entries.get_mut(index) else {
            warn!(
                "Ignoring update of {} at index {} ({} entries)",
                field,
                index,
                self.entries.len()
            );
            return false;
        };

        match field {
            ExpenseField::Amount => entry.amount = value.to_string(),
            ExpenseField::Date => entry.date = value.to_string(),
            ExpenseField::Description => entry.description = truncate_chars(value, max_len),
        }
        true
    }

    pub fn get(&self, index: usize) -> Option<&ExpenseEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpenseEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[ExpenseEntry] {
        &self.entries
    }

    /// Sum of all parseable amounts; the rest count as zero.
    pub fn total(&self) -> Decimal {
        total_of(&self.entries)
    }
}

/// Sum of the parseable amounts in `entries`.
pub fn total_of(entries: &[ExpenseEntry]) -> Decimal {
    entries
        .iter()
        .filter_map(ExpenseEntry::parsed_amount)
        .sum()
}

/// Parse an amount that counts towards a total.
///
/// Accepts non-negative plain decimals with at most two fractional digits
/// ("12", "12.5", "12.50"). Blank, signed or otherwise malformed strings
/// yield `None`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (integer, fraction) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(f) = fraction {
        if f.is_empty() || f.len() > 2 || !f.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    Decimal::from_str(s).ok()
}

/// Format an amount with exactly two fractional digits.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
