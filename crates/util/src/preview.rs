//! Bounded previews of payloads for debug logging.

use serde_json::Value;

use crate::redaction::{redact_json, redact_sensitive};

/// Length used for argument and response previews in request logs.
pub const DEFAULT_PREVIEW_LEN: usize = 200;

/// Truncate `input` to at most `max_chars` characters, appending `...` when cut.
///
/// Counts `char`s rather than bytes so multi-byte text is never split.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &input[..byte_index]),
        None => input.to_string(),
    }
}

/// Redacted, truncated preview of free text.
pub fn preview(input: &str) -> String {
    truncate_chars(&redact_sensitive(input), DEFAULT_PREVIEW_LEN)
}

/// Redacted, truncated preview of a JSON value in its compact serialized form.
pub fn preview_json(value: &Value) -> String {
    let redacted = redact_json(value);
    let serialized = serde_json::to_string(&redacted).unwrap_or_default();
    truncate_chars(&serialized, DEFAULT_PREVIEW_LEN)
}
