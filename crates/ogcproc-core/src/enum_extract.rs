//! Enumeration extraction.
//!
//! Collects leaf `enum` values from a schema fragment that may nest them
//! under `properties`, `oneOf` or `allOf`. Extended schemas use this shape to
//! list the binary media types an input or output accepts, e.g.
//!
//! ```json
//! {"oneOf": [{"allOf": [{"$ref": "link.json"},
//!                       {"properties": {"type": {"enum": ["image/tiff", "image/png"]}}}]}]}
//! ```

use serde_json::Value;
use tracing::warn;

use crate::schema_utils::value_to_string;

/// Depth used by [`extract_enum`] when no explicit bound is given.
pub const DEFAULT_EXTRACT_DEPTH: usize = 32;

/// Collect enumeration values from `schema`, duplicates preserved.
///
/// Exactly one rule applies per fragment, checked in this order:
/// 1. `enum`: emit its values, stop descending
/// 2. `properties`: recurse into every property, in insertion order
/// 3. `oneOf`: recurse into every alternative, in list order
/// 4. `allOf`: recurse into every member, in list order
/// 5. otherwise: emit nothing
pub fn extract_enum(schema: &Value) -> Vec<String> {
    extract_enum_bounded(schema, DEFAULT_EXTRACT_DEPTH)
}

/// [`extract_enum`] with an explicit nesting bound. Fragments deeper than
/// `max_depth` contribute nothing.
pub fn extract_enum_bounded(schema: &Value, max_depth: usize) -> Vec<String> {
    let mut values = Vec::new();
    collect(schema, 0, max_depth, &mut values);
    values
}

fn collect(schema: &Value, depth: usize, max_depth: usize, values: &mut Vec<String>) {
    if depth > max_depth {
        warn!(max_depth, "enum extraction depth exceeded, ignoring deeper fragments");
        return;
    }
    let Some(obj) = schema.as_object() else {
        return;
    };

    if let Some(list) = obj.get("enum").and_then(Value::as_array) {
        values.extend(list.iter().map(value_to_string));
    } else if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for prop in props.values() {
            collect(prop, depth + 1, max_depth, values);
        }
    } else if let Some(variants) = obj.get("oneOf").and_then(Value::as_array) {
        for variant in variants {
            collect(variant, depth + 1, max_depth, values);
        }
    } else if let Some(members) = obj.get("allOf").and_then(Value::as_array) {
        for member in members {
            collect(member, depth + 1, max_depth, values);
        }
    }
}

/// Re-join enumeration entries that were split for readability.
///
/// An entry starting with a space continues the entry before it: it is
/// appended to that entry with a `,` separator and removed. A leading
/// continuation with nothing before it is kept as-is.
pub fn merge_split_entries(values: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        match merged.last_mut() {
            Some(previous) if value.starts_with(' ') => {
                previous.push(',');
                previous.push_str(&value);
            }
            _ => merged.push(value),
        }
    }
    merged
}

/// Remove duplicates, keeping the first occurrence of each value.
pub fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

/// Extract, merge and deduplicate: the media-type list shown to users.
pub fn media_types(schema: &Value, max_depth: usize) -> Vec<String> {
    dedup_preserving_order(merge_split_entries(extract_enum_bounded(
        schema, max_depth,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_enum_only_returns_list_in_order() {
        let schema = json!({"enum": ["b", "a", "c"]});
        assert_eq!(extract_enum(&schema), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_one_of_concatenates_alternatives() {
        let schema = json!({"oneOf": [{"enum": ["A", "B"]}, {"enum": ["C"]}]});
        assert_eq!(extract_enum(&schema), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_enum_takes_precedence_over_siblings() {
        let schema = json!({
            "enum": ["x"],
            "properties": {"p": {"enum": ["y"]}},
            "oneOf": [{"enum": ["z"]}]
        });
        assert_eq!(extract_enum(&schema), vec!["x"]);
    }

    #[test]
    fn test_properties_take_precedence_over_one_of() {
        let schema = json!({
            "properties": {"first": {"enum": ["p1"]}, "second": {"enum": ["p2"]}},
            "oneOf": [{"enum": ["ignored"]}]
        });
        assert_eq!(extract_enum(&schema), vec!["p1", "p2"]);
    }

    #[test]
    fn test_nested_all_of_inside_one_of() {
        let schema = json!({
            "oneOf": [
                {"allOf": [
                    {"$ref": "http://zoo-project.org/dl/link.json"},
                    {"properties": {"type": {"enum": ["image/tiff", "image/jpeg"]}}}
                ]},
                {"properties": {"value": {"oneOf": [
                    {"contentMediaType": "image/tiff", "type": "string"}
                ]}}}
            ]
        });
        assert_eq!(extract_enum(&schema), vec!["image/tiff", "image/jpeg"]);
    }

    #[test]
    fn test_duplicates_preserved_by_extract() {
        let schema = json!({"oneOf": [{"enum": ["a"]}, {"enum": ["a"]}]});
        assert_eq!(extract_enum(&schema), vec!["a", "a"]);
    }

    #[test]
    fn test_non_object_and_empty_yield_nothing() {
        assert!(extract_enum(&json!("string")).is_empty());
        assert!(extract_enum(&json!({})).is_empty());
        assert!(extract_enum(&json!({"type": "string"})).is_empty());
    }

    #[test]
    fn test_depth_bound_stops_descent() {
        let schema = json!({"oneOf": [{"oneOf": [{"enum": ["deep"]}]}]});
        assert!(extract_enum_bounded(&schema, 1).is_empty());
        assert_eq!(extract_enum_bounded(&schema, 2), vec!["deep"]);
    }

    #[test]
    fn test_merge_then_dedup() {
        let values = vec!["abc".to_string(), " def".to_string(), "ghi".to_string()];
        let merged = dedup_preserving_order(merge_split_entries(values));
        assert_eq!(merged, vec!["abc, def", "ghi"]);
    }

    #[test]
    fn test_merge_chains_continuations() {
        let values = vec!["a".into(), " b".into(), " c".into(), "d".into()];
        assert_eq!(merge_split_entries(values), vec!["a, b, c", "d"]);
    }

    #[test]
    fn test_merge_keeps_leading_continuation() {
        let values = vec![" lead".into(), "x".into()];
        assert_eq!(merge_split_entries(values), vec![" lead", "x"]);
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let values = vec!["b".into(), "a".into(), "b".into(), "c".into(), "a".into()];
        assert_eq!(dedup_preserving_order(values), vec!["b", "a", "c"]);
    }
}
