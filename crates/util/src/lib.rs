//! Log-safety helpers shared by the mesh gateway crates.
//!
//! Tool arguments, tool responses and login templates can all carry
//! credentials. Everything that ends up in a log line goes through
//! [`redact_sensitive`] / [`redact_json`] first, and large payloads are
//! shortened with [`preview`].

mod preview;
mod redaction;

pub use preview::{DEFAULT_PREVIEW_LEN, preview, preview_json, truncate_chars};
pub use redaction::{is_sensitive_key, redact_json, redact_sensitive, redact_sensitive_with};
