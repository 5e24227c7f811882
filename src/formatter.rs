//! Response formatter.
//!
//! Turns a backend payload into the markdown shown in the chat window:
//! normalize the input, classify its shape, filter and deduplicate events,
//! then render. Formatting never fails; any unexpected structure degrades to
//! pretty-printed JSON of the payload.

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::FormatterSettings;
use crate::dedup::{group_events, Grouping};
use crate::error::FormatError;
use crate::payload::{classify, normalize_input, normalize_text, scalar_text, Normalized, Payload, ShapeKind};
use crate::render::{render_legacy, render_year_groups, NOT_FOUND_MESSAGE, NO_DATA_MESSAGE};
use crate::scaffold::{extract_records, ScaffoldFilter};

/// Kept events for one year, as reported by `inspect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearSummary {
    pub year: String,
    pub kept: usize,
}

/// What the pipeline did with one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatReport {
    pub shape: ShapeKind,
    pub records_total: usize,
    pub dropped_empty: usize,
    pub dropped_scaffold: usize,
    pub dropped_short: usize,
    pub duplicates: usize,
    pub years: Vec<YearSummary>,
    pub answer_used: bool,
    /// Set when formatting fell back to raw JSON because of an error.
    pub degraded: Option<String>,
    pub output: String,
}

impl FormatReport {
    fn new(shape: ShapeKind) -> Self {
        Self {
            shape,
            records_total: 0,
            dropped_empty: 0,
            dropped_scaffold: 0,
            dropped_short: 0,
            duplicates: 0,
            years: Vec::new(),
            answer_used: false,
            degraded: None,
            output: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    settings: FormatterSettings,
    filter: ScaffoldFilter,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(FormatterSettings::default())
    }
}

impl ResponseFormatter {
    pub fn new(settings: FormatterSettings) -> Self {
        let filter = ScaffoldFilter::new(settings.banned_prefixes.clone());
        Self { settings, filter }
    }

    pub fn settings(&self) -> &FormatterSettings {
        &self.settings
    }

    /// Format a payload that may be text or parsed JSON.
    pub fn format(&self, raw: &Value) -> String {
        self.inspect(raw).output
    }

    /// Format raw response text.
    pub fn format_text(&self, raw: &str) -> String {
        self.inspect_text(raw).output
    }

    pub fn inspect(&self, raw: &Value) -> FormatReport {
        self.run(normalize_input(raw))
    }

    pub fn inspect_text(&self, raw: &str) -> FormatReport {
        self.run(normalize_text(raw))
    }

    fn run(&self, normalized: Normalized<'_>) -> FormatReport {
        let value = match normalized {
            Normalized::Finished(text) => {
                let mut report = FormatReport::new(ShapeKind::Text);
                report.output = text;
                return report;
            }
            Normalized::Object(value) => value,
        };

        let payload = classify(&value);
        let mut report = FormatReport::new(payload.kind());
        match self.render(payload, &value, &mut report) {
            Ok(output) => report.output = output,
            Err(e) => {
                error!("Error formatting history response: {}", e);
                report.degraded = Some(e.to_string());
                report.output = fallback_text(&value);
            }
        }
        report
    }

    fn render(
        &self,
        payload: Payload<'_>,
        value: &Value,
        report: &mut FormatReport,
    ) -> Result<String, FormatError> {
        match payload {
            Payload::NoData => Ok(NO_DATA_MESSAGE.to_string()),
            Payload::Events { answer, records } => self.render_events(records, answer, report),
            Payload::Documents { records } => self.render_events(records, None, report),
            Payload::LegacyYearKeyed(entries) => {
                Ok(render_legacy(&entries)?.unwrap_or_else(|| fallback_text(value)))
            }
            Payload::Opaque(_) => Ok(fallback_text(value)),
        }
    }

    fn render_events(
        &self,
        values: &[Value],
        answer: Option<&str>,
        report: &mut FormatReport,
    ) -> Result<String, FormatError> {
        let extraction = extract_records(values, self.settings.unicode_nfc)?;
        let mut records = extraction.records;
        report.records_total = values.len();
        report.dropped_empty = extraction.dropped_empty;
        report.dropped_scaffold = self.filter.retain(&mut records);

        let grouping = group_events(
            records,
            self.settings.key_length,
            self.settings.min_key_length,
        );
        report.dropped_short = grouping.short_keys;
        report.duplicates = grouping.duplicates;
        report.years = year_summaries(&grouping);

        let answer = answer.map(str::trim).filter(|a| !a.is_empty());
        if let Some(answer) = answer {
            report.answer_used = true;
            return Ok(answer.to_string());
        }

        if grouping.is_empty() {
            return Ok(NOT_FOUND_MESSAGE.to_string());
        }

        info!(
            "Formatted {} events into {} years ({} scaffold, {} duplicates dropped)",
            grouping.len(),
            grouping.groups.len(),
            report.dropped_scaffold,
            report.duplicates
        );
        Ok(render_year_groups(&grouping))
    }
}

fn year_summaries(grouping: &Grouping) -> Vec<YearSummary> {
    grouping
        .sorted()
        .into_iter()
        .map(|g| YearSummary {
            year: g.year.label().to_string(),
            kept: g.contents.len(),
        })
        .collect()
}

/// Pretty JSON for objects and arrays, plain text for scalars.
fn fallback_text(value: &Value) -> String {
    match value {
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => scalar_text(other).unwrap_or_else(|| "null".to_string()),
    }
}

/// Format a payload with default settings.
pub fn format_response(raw: &Value) -> String {
    ResponseFormatter::default().format(raw)
}

/// Format raw response text with default settings.
pub fn format_response_text(raw: &str) -> String {
    ResponseFormatter::default().format_text(raw)
}
