//! Utility functions for the Skyshot API client
//!
//! String helpers that respect UTF-8 boundaries (used when logging response
//! bodies) and the error-body flattening shared by [`crate::error`] and the
//! sign-in flow.

use serde_json::Value;

/// Keys whose messages are shown without a field label.
const UNLABELLED_KEYS: &[&str] = &["detail", "message", "error", "non_field_errors"];

/// Safely truncate a string at a UTF-8 character boundary.
///
/// Returns a slice of at most `max_bytes` bytes, ensuring the result
/// is valid UTF-8 by finding the last valid character boundary.
///
/// # Example
/// ```
/// use skyshot_client::utils::safe_truncate;
///
/// // Emoji is 4 bytes - truncating at byte 10 would cut it in half
/// let text = "Status: 🔍 Active";
/// let result = safe_truncate(text, 10);
/// assert_eq!(result, "Status: "); // Stops before the emoji
/// ```
#[inline]
#[must_use]
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    &s[..boundary]
}

/// Truncate a string for display with ellipsis.
///
/// # Example
/// ```
/// use skyshot_client::utils::truncate_for_display;
///
/// let text = "This is a long message";
/// let result = truncate_for_display(text, 10);
/// assert_eq!(result, "This is a ...");
/// ```
#[must_use]
pub fn truncate_for_display(s: &str, max_bytes: usize) -> String {
    let truncated = safe_truncate(s, max_bytes);
    if truncated.len() < s.len() {
        format!("{truncated}...")
    } else {
        truncated.to_string()
    }
}

/// Flatten a backend error body into an ordered, de-duplicated list of
/// human-readable messages.
///
/// Field errors are labelled with the humanized key path; `detail`,
/// `message`, `error` and `non_field_errors` are shown bare.
///
/// # Example
/// ```
/// use skyshot_client::utils::flatten_error_messages;
///
/// let body = serde_json::json!({
///     "field1": ["Required"],
///     "nested": { "field2": "Too short" }
/// });
/// assert_eq!(
///     flatten_error_messages(&body),
///     vec!["Field1: Required".to_string(), "Nested field2: Too short".to_string()]
/// );
/// ```
#[must_use]
pub fn flatten_error_messages(value: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    let mut path = Vec::new();
    collect_messages(value, &mut path, &mut messages);
    messages
}

/// First distinct message in a backend error body
#[must_use]
pub fn first_error_message(value: &Value) -> Option<String> {
    flatten_error_messages(value).into_iter().next()
}

fn collect_messages<'a>(value: &'a Value, path: &mut Vec<&'a str>, out: &mut Vec<String>) {
    match value {
        Value::String(text) => push_message(out, path, text),
        Value::Number(n) => push_message(out, path, &n.to_string()),
        Value::Bool(b) => push_message(out, path, &b.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_messages(item, path, out);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                if UNLABELLED_KEYS.contains(&key.as_str()) {
                    collect_messages(nested, path, out);
                } else {
                    path.push(key.as_str());
                    collect_messages(nested, path, out);
                    path.pop();
                }
            }
        }
        Value::Null => {}
    }
}

fn push_message(out: &mut Vec<String>, path: &[&str], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let message = if path.is_empty() {
        text.to_string()
    } else {
        format!("{}: {text}", humanize_path(path))
    };

    if !out.contains(&message) {
        out.push(message);
    }
}

/// `["nested", "first_name"]` becomes `"Nested first name"`.
fn humanize_path(path: &[&str]) -> String {
    let joined = path
        .iter()
        .map(|segment| segment.replace(['_', '-'], " "))
        .collect::<Vec<_>>()
        .join(" ");

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => joined,
    }
}

/// Sniff whether a response body is an HTML page.
#[must_use]
pub fn looks_like_html(content_type: Option<&str>, body: &str) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return true;
    }

    let head = safe_truncate(body.trim_start(), 64).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
