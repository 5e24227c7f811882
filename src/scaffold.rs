//! Event extraction and scaffold filtering.
//!
//! The backend's answer templates leak step markers ("B1.", "B2.") and
//! meta commentary ("Câu hỏi nhắm tới ...") into event stories. Records whose
//! text opens with one of those markers are template residue and are dropped
//! before grouping.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::dedup::YearKey;
use crate::error::{ErrorCode, FormatError};
use crate::payload::{is_falsy, scalar_text};

lazy_static! {
    static ref YEAR_PREFIX: Regex = Regex::new(r"(?i)^Năm [0-9]+,\s*").expect("valid regex");
}

/// One event candidate: its year bucket and trimmed text.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub year: YearKey,
    pub content: String,
}

/// Remove a leading "Năm <year>, " from `text`.
pub fn strip_year_prefix(text: &str) -> &str {
    match YEAR_PREFIX.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Records pulled out of a raw event array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<EventRecord>,
    /// Entries that were null, not objects, or had no text.
    pub dropped_empty: usize,
}

/// Build records from raw event values.
///
/// Fails only when `story` or `event` holds a non-string value that would be
/// chosen as the text.
pub fn extract_records(values: &[Value], unicode_nfc: bool) -> Result<Extraction, FormatError> {
    let mut extraction = Extraction::default();

    for value in values {
        let record = match value {
            Value::Object(map) => extract_record(map, unicode_nfc)?,
            _ => None,
        };
        match record {
            Some(record) => extraction.records.push(record),
            None => {
                debug!("{}: skipping event without text", ErrorCode::FieldAbsence.as_str());
                extraction.dropped_empty += 1;
            }
        }
    }

    Ok(extraction)
}

fn extract_record(map: &Map<String, Value>, unicode_nfc: bool) -> Result<Option<EventRecord>, FormatError> {
    let content = match text_field(map, "story")? {
        Some(story) => story,
        None => text_field(map, "event")?.unwrap_or(""),
    };
    let content = content.trim();
    if content.is_empty() {
        return Ok(None);
    }

    let content = if unicode_nfc {
        content.nfc().collect::<String>()
    } else {
        content.to_string()
    };

    let year = match map.get("year").and_then(scalar_text) {
        Some(label) => YearKey::from_label(label),
        None => YearKey::Other,
    };

    Ok(Some(EventRecord { year, content }))
}

/// A text field that counts as set. Falsy values count as unset; any other
/// non-string value is an error.
fn text_field<'a>(map: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>, FormatError> {
    match map.get(field) {
        None => Ok(None),
        Some(value) if is_falsy(value) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(FormatError::unexpected(format!("event field '{}' is not text", field))
            .with_details(other.to_string())),
    }
}

// ============================================================================
// Scaffold Filter
// ============================================================================

/// Drops records that open with a banned prefix.
#[derive(Debug, Clone)]
pub struct ScaffoldFilter {
    prefixes: Vec<String>,
}

impl ScaffoldFilter {
    pub fn new(prefixes: Vec<String>) -> Self {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.nfc().collect::<String>())
            .collect();
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `content`, after any "Năm <year>, " lead-in, starts with a
    /// banned prefix.
    pub fn is_scaffold(&self, content: &str) -> bool {
        let body = strip_year_prefix(content).trim();
        self.prefixes.iter().any(|p| body.starts_with(p.as_str()))
    }

    /// Remove scaffold records in place; returns how many were removed.
    pub fn retain(&self, records: &mut Vec<EventRecord>) -> usize {
        let before = records.len();
        records.retain(|record| {
            let scaffold = self.is_scaffold(&record.content);
            if scaffold {
                debug!(
                    "Dropping scaffold event in {}: '{}'",
                    record.year.label(),
                    record.content
                );
            }
            !scaffold
        });
        before - records.len()
    }
}

impl Default for ScaffoldFilter {
    fn default() -> Self {
        Self::new(crate::config::FormatterSettings::default().banned_prefixes)
    }
}
