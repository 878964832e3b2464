//! Array item-count bounds resolved across `oneOf` alternatives.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effective `(min, max)` item counts of an array schema.
///
/// `min` is the smallest declared `minItems` (or `+∞` when none declares it);
/// `max` is the largest declared `maxItems` (or `-∞`). The infinite sentinels
/// mean "no usable bound", which [`ArrayBounds::min_items`] and
/// [`ArrayBounds::max_items`] surface as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrayBounds {
    pub min: f64,
    pub max: f64,
}

impl ArrayBounds {
    /// Resolve the bounds declared by the `oneOf` alternatives of `schema`.
    ///
    /// An absent or empty `oneOf` yields `(+∞, -∞)`.
    pub fn resolve(schema: &Value) -> Self {
        let mut bounds = Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };
        let alternatives = schema
            .get("oneOf")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for alternative in alternatives {
            if let Some(min) = alternative.get("minItems").and_then(Value::as_f64) {
                bounds.min = bounds.min.min(min);
            }
            if let Some(max) = alternative.get("maxItems").and_then(Value::as_f64) {
                bounds.max = bounds.max.max(max);
            }
        }
        bounds
    }

    pub fn min_items(&self) -> Option<u64> {
        usable(self.min)
    }

    pub fn max_items(&self) -> Option<u64> {
        usable(self.max)
    }
}

fn usable(bound: f64) -> Option<u64> {
    (bound.is_finite() && bound >= 0.0).then_some(bound as u64)
}
