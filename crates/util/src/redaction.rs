//! # Redaction
//!
//! Pattern-based masking of secret-looking values in free text and in JSON
//! documents. Key names are preserved so log lines stay useful for debugging.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const REPLACEMENT: &str = "[REDACTED]";

/// Matches JSON object keys (and `key=value` style keys) that carry secrets.
static SENSITIVE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(password|passwd|secret|token|api[_-]?key|authorization|credential)").expect("sensitive key regex"));

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Authorization: Bearer abc / Authorization: Basic abc
        r"(?i)(authorization:\s*)((?:bearer|basic)\s+)?([\w\-\.=:/+]+)",
        // API_KEY=..., GITHUB_TOKEN=..., DB_PASSWORD=...
        r"(?i)(\b[A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
        // ?token=... in URLs
        r"(?i)([?&](?:token|access_token|password)=)([^&\s]+)",
        // "password":"..." inside serialized JSON
        r#"(?i)("(?:password|token|secret)"\s*:\s*")([^"]*)(")"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("redaction regex"))
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// ```rust
/// use mesh_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("API_KEY=abc123"), "API_KEY=[REDACTED]");
/// assert_eq!(redact_sensitive("/search?token=abc"), "/search?token=[REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    redact_sensitive_with(input, REPLACEMENT)
}

/// Redacts sensitive-looking values, using a custom replacement token.
pub fn redact_sensitive_with(input: &str, replacement: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                // The closing quote of the JSON pattern is the only third group that must survive.
                let suffix = match captures.get(3) {
                    Some(m) if m.as_str() == "\"" => "\"",
                    _ => "",
                };
                format!("{prefix}{replacement}{suffix}")
            })
            .into_owned();
    }
    redacted
}

/// Whether a key name (JSON field, header, env var) denotes a secret.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEY.is_match(key)
}

/// Recursively redacts sensitive data from JSON values.
///
/// Values under sensitive keys are replaced wholesale; every other string is
/// passed through [`redact_sensitive`].
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, inner) in map {
                let redacted = if is_sensitive_key(key) && !inner.is_null() {
                    Value::String(REPLACEMENT.to_string())
                } else {
                    redact_json(inner)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_env_style_assignments() {
        assert_eq!(redact_sensitive("GITHUB_TOKEN=ghp_123 other=1"), "GITHUB_TOKEN=[REDACTED] other=1");
    }

    #[test]
    fn redacts_authorization_headers() {
        assert_eq!(redact_sensitive("Authorization: Bearer abc.def"), "Authorization: [REDACTED]");
    }

    #[test]
    fn redacts_token_query_values() {
        assert_eq!(redact_sensitive("/search?token=abc%2B&x=1"), "/search?token=[REDACTED]&x=1");
    }

    #[test]
    fn redacts_serialized_json_passwords() {
        let input = r#"{"username":"bob","password":"hunter2"}"#;
        assert_eq!(redact_sensitive(input), r#"{"username":"bob","password":"[REDACTED]"}"#);
    }

    #[test]
    fn redact_json_masks_sensitive_keys_recursively() {
        let value = json!({
            "path": "/tmp/x",
            "auth": { "Password": "hunter2", "user": "bob" },
            "items": [{ "api_key": "k" }],
            "token": null
        });
        let redacted = redact_json(&value);
        assert_eq!(redacted["path"], "/tmp/x");
        assert_eq!(redacted["auth"]["Password"], REPLACEMENT);
        assert_eq!(redacted["auth"]["user"], "bob");
        assert_eq!(redacted["items"][0]["api_key"], REPLACEMENT);
        assert!(redacted["token"].is_null());
    }
}
