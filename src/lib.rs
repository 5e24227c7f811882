// HistoryMind Library - Response formatting for the history Q&A chat client
//
// Turns backend payloads (free-form answers, event lists grouped by year,
// or the legacy year-keyed shape) into deduplicated markdown.

pub mod config;
pub mod dedup;
pub mod error;
pub mod formatter;
pub mod payload;
pub mod render;
pub mod scaffold;

// Re-export key types for convenience
pub use config::{
    ensure_config_dir, get_config_dir, get_settings_path, read_settings, read_settings_at,
    write_settings, write_settings_at, FormatterSettings, DEFAULT_BANNED_PREFIXES,
};
pub use dedup::{group_events, normalize_content, similarity, similarity_key, YearGroup, YearKey};
pub use error::{ErrorCode, FormatError};
pub use formatter::{
    format_response, format_response_text, FormatReport, ResponseFormatter, YearSummary,
};
pub use payload::{classify, normalize_input, normalize_text, Normalized, Payload, ShapeKind};
pub use render::{NOT_FOUND_MESSAGE, NO_DATA_MESSAGE, OTHER_YEAR_HEADING};
pub use scaffold::{EventRecord, ScaffoldFilter};
