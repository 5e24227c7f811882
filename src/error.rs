//! Error types for the response formatter.
//!
//! Every error here is recovered somewhere inside the crate. Callers of
//! `format_response` only ever see a string.

use serde::{Deserialize, Serialize};

// ============================================================================
// Error Types
// ============================================================================

/// Categorized failure classes for formatting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A JSON-looking string that does not parse.
    ParseFailure,
    /// An object that matches none of the known payload shapes.
    ShapeMismatch,
    /// A missing year, content or summary field.
    FieldAbsence,
    /// A field holding a value of the wrong type, e.g. `persons: "x"`.
    UnexpectedShape,
}

impl ErrorCode {
    /// Whether the error is handled where it occurs rather than at the top level.
    pub fn recovered_locally(&self) -> bool {
        !matches!(self, ErrorCode::UnexpectedShape)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseFailure => "parse_failure",
            ErrorCode::ShapeMismatch => "shape_mismatch",
            ErrorCode::FieldAbsence => "field_absence",
            ErrorCode::UnexpectedShape => "unexpected_shape",
        }
    }
}

/// A structured formatting error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl FormatError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedShape, message)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({}): {}", self.message, self.code.as_str(), details),
            None => write!(f, "{} ({})", self.message, self.code.as_str()),
        }
    }
}

impl std::error::Error for FormatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ParseFailure.as_str(), "parse_failure");
        assert_eq!(ErrorCode::UnexpectedShape.as_str(), "unexpected_shape");
    }

    #[test]
    fn test_only_unexpected_shape_escapes() {
        assert!(ErrorCode::ParseFailure.recovered_locally());
        assert!(ErrorCode::ShapeMismatch.recovered_locally());
        assert!(ErrorCode::FieldAbsence.recovered_locally());
        assert!(!ErrorCode::UnexpectedShape.recovered_locally());
    }

    #[test]
    fn test_display_with_details() {
        let err = FormatError::unexpected("persons is not an array").with_details("year 938");
        assert_eq!(
            err.to_string(),
            "persons is not an array (unexpected_shape): year 938"
        );
    }

    #[test]
    fn test_error_serialization() {
        let err = FormatError::new(ErrorCode::FieldAbsence, "missing summary");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "field_absence");
        assert!(json["details"].is_null());
    }
}
