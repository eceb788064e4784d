//! Payload template rendering.
//!
//! A payload template is any JSON value. A string leaf that consists solely
//! of a `{{path.to.value}}` placeholder is replaced with the value found at
//! that dot-separated path in the event data. Everything else is copied
//! through untouched:
//!
//! - placeholders whose path does not resolve stay as the literal string,
//! - strings that merely *contain* a placeholder are not interpolated,
//! - numbers, booleans and `null` are returned as-is.
//!
//! Rendering is pure and deterministic.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Regex pattern matching a string that is exactly one `{{path}}` placeholder.
pub const PLACEHOLDER_PATTERN: &str = r"^\{\{\s*([^{}\s]+)\s*\}\}$";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Render `template` against `context`, returning a new value.
pub fn render(template: &Value, context: &Value) -> Value {
    match template {
        Value::String(s) => render_string(s, context),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render(v, context)))
                .collect(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => template.clone(),
    }
}

/// Extract the path from a full-string placeholder, if `s` is one.
pub fn placeholder_path(s: &str) -> Option<&str> {
    PLACEHOLDER_RE
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Walk a dot-separated object path. Arrays are not indexed.
pub fn resolve_path<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(context, |current, key| current.as_object()?.get(key))
}

fn render_string(s: &str, context: &Value) -> Value {
    placeholder_path(s)
        .and_then(|path| resolve_path(context, path))
        .cloned()
        .unwrap_or_else(|| Value::String(s.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
