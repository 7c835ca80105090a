//! JSON rendering of command records
//!
//! Results go to stdout indented; errors go to stderr on a single line so
//! callers can read them line by line.

use serde::Serialize;

use super::types::error_codes;

/// How a record is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Indented, for command results.
    Pretty,
    /// One line, for errors.
    Line,
}

/// Render `record` as JSON. A record that cannot be serialized renders as a
/// `SERIALIZATION_ERROR` response, so the output is always valid JSON.
pub fn render<T: Serialize>(record: &T, layout: Layout) -> String {
    let rendered = match layout {
        Layout::Pretty => serde_json::to_string_pretty(record),
        Layout::Line => serde_json::to_string(record),
    };
    rendered.unwrap_or_else(|e| {
        serde_json::json!({
            "error": true,
            "code": error_codes::SERIALIZATION_ERROR,
            "message": e.to_string(),
        })
        .to_string()
    })
}
