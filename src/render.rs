// Markdown rendering for formatted history responses
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::dedup::{Grouping, YearKey};
use crate::error::{ErrorCode, FormatError};
use crate::payload::{has_summary, scalar_text};

pub const NO_DATA_MESSAGE: &str =
    "Xin lỗi, tôi không tìm thấy thông tin lịch sử phù hợp với yêu cầu của bạn.";
pub const NOT_FOUND_MESSAGE: &str = "Xin lỗi, tôi không tìm thấy thông tin phù hợp.";
pub const OTHER_YEAR_HEADING: &str = "Sự kiện khác";

/// Strip "Năm <year>, " when it repeats the section heading.
fn strip_heading_year(content: &str, year: &YearKey) -> String {
    let YearKey::Year(label) = year else {
        return content.to_string();
    };
    match Regex::new(&format!(r"(?i)^Năm {},\s*", regex::escape(label))) {
        Ok(re) => re.replace(content, "").into_owned(),
        Err(_) => content.to_string(),
    }
}

pub fn render_year_groups(grouping: &Grouping) -> String {
    let mut md = String::new();

    for group in grouping.sorted() {
        match &group.year {
            YearKey::Year(label) => md.push_str(&format!("### Năm {}\n\n", label)),
            YearKey::Other => md.push_str(&format!("### {}\n\n", OTHER_YEAR_HEADING)),
        }
        for content in &group.contents {
            md.push_str(&format!("- {}\n", strip_heading_year(content, &group.year)));
        }
        md.push('\n');
    }

    md.trim().to_string()
}

// ============================================================================
// Legacy year-keyed responses
// ============================================================================

/// Render `{ "<year>": { summary, events } }` responses.
///
/// Returns `Ok(None)` when no entry has a summary.
pub fn render_legacy(entries: &[(String, &Value)]) -> Result<Option<String>, FormatError> {
    let mut md = String::new();
    let mut has_year_data = false;

    for (year, details) in entries {
        if !has_summary(details) {
            debug!("{}: skipping legacy key '{}'", ErrorCode::FieldAbsence.as_str(), year);
            continue;
        }
        has_year_data = true;

        let summary = details.get("summary").and_then(Value::as_str).unwrap_or_default();
        md.push_str(&format!("### Năm {}\n\n", year));
        md.push_str(&format!("**Tóm tắt:** {}\n\n", summary));

        if let Some(events) = details.get("events").and_then(Value::as_array) {
            md.push_str("**Sự kiện tiêu biểu:**\n\n");
            for event in events {
                render_legacy_event(&mut md, event)
                    .map_err(|e| e.with_details(format!("year {}", year)))?;
            }
        }
        md.push_str("---\n\n");
    }

    if has_year_data {
        Ok(Some(md.trim().to_string()))
    } else {
        Ok(None)
    }
}

fn render_legacy_event(md: &mut String, event: &Value) -> Result<(), FormatError> {
    let Value::Object(fields) = event else {
        return Err(FormatError::unexpected("legacy event is not an object"));
    };

    let text = fields.get("event").and_then(scalar_text).unwrap_or_default();
    match fields.get("year").and_then(scalar_text) {
        Some(year) => md.push_str(&format!("- **{}:** {}\n", year, text)),
        None => md.push_str(&format!("- {}\n", text)),
    }

    for (field, label) in [
        ("persons", "Nhân vật"),
        ("places", "Địa danh"),
        ("keywords", "Từ khóa"),
    ] {
        if let Some(joined) = joined_list(fields.get(field), field)? {
            md.push_str(&format!("  - *{}:* {}\n", label, joined));
        }
    }
    md.push('\n');

    Ok(())
}

/// Join a list field with ", ". Absent, null and empty lists yield `None`.
fn joined_list(value: Option<&Value>, field: &str) -> Result<Option<String>, FormatError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(Value::Array(items)) => Ok(Some(
            items
                .iter()
                .map(|item| scalar_text(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", "),
        )),
        Some(other) => Err(FormatError::unexpected(format!(
            "'{}' is not a list: {}",
            field, other
        ))),
    }
}
