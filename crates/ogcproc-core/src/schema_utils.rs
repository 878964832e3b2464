//! Shared helpers for reading untyped schema fragments.
//!
//! Provides two concerns used by the compiler:
//! 1. **JSON Pointer escaping** (RFC 6901) for diagnostic paths built from
//!    identifiers that may contain `/` or `~`
//! 2. **Typed accessors** over `serde_json::Value` fragments

use std::borrow::Cow;

use serde_json::Value;

// ---------------------------------------------------------------------------
// JSON Pointer escaping (RFC 6901)
// ---------------------------------------------------------------------------

/// Escape a single path segment per RFC 6901.
///
/// - `~` → `~0`
/// - `/` → `~1`
///
/// Returns `Cow::Borrowed` when no escaping is needed (the common case).
pub fn escape_pointer_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') || segment.contains('/') {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build a JSON Pointer path by appending segments to a parent path.
///
/// # Example
/// ```
/// use ogcproc_core::build_path;
/// assert_eq!(build_path("#/inputs", &["in/file", "schema"]), "#/inputs/in~1file/schema");
/// ```
pub fn build_path(parent: &str, segments: &[&str]) -> String {
    let mut path = parent.to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&escape_pointer_segment(segment));
    }
    path
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// The fragment's `type` keyword, when it is a single string.
pub(crate) fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// The fragment's `nullable` flag (OpenAPI 3.0 style). Absent means `false`.
pub(crate) fn is_nullable(schema: &Value) -> bool {
    schema
        .get("nullable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Render a scalar JSON value as the string a form would carry.
///
/// Strings are returned without quotes; other values use their JSON text.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read an integer default, accepting integral floats such as `256.0`.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    })
}
