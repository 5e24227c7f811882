//! Payload normalization and shape detection.
//!
//! Backend responses arrive either as text (which may itself be JSON) or as
//! an already-parsed JSON value. `normalize_input` turns that into a JSON
//! value or a finished string, and `classify` picks exactly one handling
//! branch for the value.

use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::debug;

use crate::error::ErrorCode;

// ============================================================================
// Input Normalization
// ============================================================================

/// Result of input normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<'a> {
    /// The pipeline stops here and this string is the output.
    Finished(String),
    /// A JSON value to classify.
    Object(Cow<'a, Value>),
}

/// JavaScript truthiness, which the backend contract is written against.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

pub fn normalize_input(raw: &Value) -> Normalized<'_> {
    if is_falsy(raw) {
        return Normalized::Finished(String::new());
    }
    match raw {
        Value::String(text) => normalize_text(text),
        other => Normalized::Object(Cow::Borrowed(other)),
    }
}

/// Normalize text input. Only text starting with `{` or `[` is parsed;
/// anything else, including unparseable JSON, is returned untouched.
pub fn normalize_text<'a>(text: &str) -> Normalized<'a> {
    if text.is_empty() {
        return Normalized::Finished(String::new());
    }
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Normalized::Finished(text.to_string());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Normalized::Object(Cow::Owned(value)),
        Err(e) => {
            debug!(
                "{}: treating input as prose ({})",
                ErrorCode::ParseFailure.as_str(),
                e
            );
            Normalized::Finished(text.to_string())
        }
    }
}

// ============================================================================
// Shape Detection
// ============================================================================

/// The five handling branches for a normalized value.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<'a> {
    NoData,
    Events {
        answer: Option<&'a str>,
        records: &'a [Value],
    },
    Documents {
        records: &'a [Value],
    },
    LegacyYearKeyed(Vec<(String, &'a Value)>),
    Opaque(&'a Value),
}

/// Shape names reported by `ResponseFormatter::inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Text,
    NoData,
    Events,
    Documents,
    LegacyYearKeyed,
    Opaque,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Text => "text",
            ShapeKind::NoData => "no_data",
            ShapeKind::Events => "events",
            ShapeKind::Documents => "documents",
            ShapeKind::LegacyYearKeyed => "legacy_year_keyed",
            ShapeKind::Opaque => "opaque",
        }
    }
}

impl Payload<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Payload::NoData => ShapeKind::NoData,
            Payload::Events { .. } => ShapeKind::Events,
            Payload::Documents { .. } => ShapeKind::Documents,
            Payload::LegacyYearKeyed(_) => ShapeKind::LegacyYearKeyed,
            Payload::Opaque(_) => ShapeKind::Opaque,
        }
    }
}

pub fn classify(value: &Value) -> Payload<'_> {
    match value {
        Value::Object(map) => classify_object(map, value),
        Value::Array(items) => {
            let entries: Vec<(String, &Value)> = items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item))
                .collect();
            legacy_or_opaque(entries, value)
        }
        other => Payload::Opaque(other),
    }
}

fn classify_object<'a>(map: &'a Map<String, Value>, value: &'a Value) -> Payload<'a> {
    if map.get("no_data") == Some(&Value::Bool(true)) {
        return Payload::NoData;
    }

    let events = map.get("events").and_then(Value::as_array);
    let documents = map.get("documents").and_then(Value::as_array);
    let answer = map.get("answer").and_then(Value::as_str);

    if events.is_some() || answer.is_some() {
        let records = events.or(documents).map(Vec::as_slice).unwrap_or(&[]);
        return Payload::Events { answer, records };
    }
    if let Some(documents) = documents {
        return Payload::Documents { records: documents };
    }

    let entries = js_key_order(map.keys().map(String::as_str))
        .into_iter()
        .filter_map(|key| map.get(key).map(|v| (key.to_string(), v)))
        .collect();
    legacy_or_opaque(entries, value)
}

fn legacy_or_opaque<'a>(entries: Vec<(String, &'a Value)>, value: &'a Value) -> Payload<'a> {
    if entries.iter().any(|(_, v)| has_summary(v)) {
        Payload::LegacyYearKeyed(entries)
    } else {
        debug!(
            "{}: no known payload shape, falling back to JSON",
            ErrorCode::ShapeMismatch.as_str()
        );
        Payload::Opaque(value)
    }
}

/// A legacy year entry is an object with a non-empty `summary` string.
pub fn has_summary(value: &Value) -> bool {
    value
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| !s.is_empty())
        .unwrap_or(false)
}

/// Order object keys the way a JavaScript engine enumerates them:
/// array-index keys ascending, then the rest in insertion order.
pub fn js_key_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let (mut indices, rest): (Vec<&str>, Vec<&str>) = keys.partition(|k| array_index(k).is_some());
    indices.sort_by_key(|k| array_index(k));
    indices.extend(rest);
    indices
}

fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|&n| n != u32::MAX)
}

// ============================================================================
// Scalar Display
// ============================================================================

/// Render a JSON scalar the way string interpolation would show it.
/// `null` has no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_text(n)),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn number_text(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
