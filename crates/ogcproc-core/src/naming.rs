//! Identifier normalization and the reserved argument keys.
//!
//! The form layer and the payload layer must agree on every generated name,
//! so all name construction lives here. Each transform is idempotent:
//! `normalize_identifier(normalize_identifier(x)) == normalize_identifier(x)`.

/// Key carrying the remote process identifier. Never normalized.
pub const PROCESS_KEY: &str = "name";
/// Key carrying the `Prefer` header choice.
pub const PREFER_KEY: &str = "prefer";
/// Key carrying the response type (`raw` or `document`).
pub const RESPONSE_KEY: &str = "response";
/// Prefix of per-output media-type selections.
pub const OUTPUT_TYPE_PREFIX: &str = "outputType_";
/// Prefix of per-output transmission-mode selections.
pub const TRANSMISSION_PREFIX: &str = "transmissionMode_";
/// Prefix of the per-file-input array flag. No separator follows it.
pub const IS_ARRAY_PREFIX: &str = "isArray";
/// Prefix of per-output target paths supplied by the calling environment.
pub const OUTPUT_DATA_PREFIX: &str = "output_data_";

/// Turn a process-description identifier into a form identifier.
///
/// Dots and spaces both become underscores.
pub fn normalize_identifier(name: &str) -> String {
    name.replace(['.', ' '], "_")
}

/// Identifier of the generated tool: a normalized, lower-cased process id.
pub fn tool_id(process_id: &str) -> String {
    normalize_identifier(process_id).to_lowercase()
}

/// Form value for a select option. Spaces become underscores.
pub fn option_key(value: &str) -> String {
    value.replace(' ', "_")
}

/// Best-effort inverse of [`option_key`] for values that match no known option.
pub fn restore_option_value(key: &str) -> String {
    key.replace('_', " ")
}

/// File-format suffix of a media type: the text after the final `/`.
///
/// `image/png` → `png`; a string without `/` is returned unchanged.
pub fn media_suffix(media_type: &str) -> &str {
    media_type.rsplit('/').next().unwrap_or(media_type)
}

pub fn output_type_key(output: &str) -> String {
    format!("{OUTPUT_TYPE_PREFIX}{output}")
}

pub fn transmission_key(output: &str) -> String {
    format!("{TRANSMISSION_PREFIX}{output}")
}

pub fn is_array_key(input: &str) -> String {
    format!("{IS_ARRAY_PREFIX}{input}")
}

pub fn output_data_key(output: &str) -> String {
    format!("{OUTPUT_DATA_PREFIX}{output}")
}

/// Whether `key` is one of the reserved control keys rather than an input.
pub fn is_reserved_key(key: &str) -> bool {
    matches!(key, PROCESS_KEY | PREFER_KEY | RESPONSE_KEY)
        || key.starts_with(OUTPUT_TYPE_PREFIX)
        || key.starts_with(TRANSMISSION_PREFIX)
        || key.starts_with(IS_ARRAY_PREFIX)
        || key.starts_with(OUTPUT_DATA_PREFIX)
}
