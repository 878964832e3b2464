//! Diagnostics emitted while compiling a process description.

use serde::{Deserialize, Serialize};

/// A non-fatal problem found while compiling one entry of a process description.
///
/// The offending entry is skipped; the rest of the descriptor is still produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Location in the description (e.g. "#/inputs/il/extended-schema").
    pub path: String,
    /// Classification of the diagnostic.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
}

/// Classification of compilation diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The entry's `type` maps to no parameter kind.
    UnsupportedType { found: Option<String> },
    /// An array's item `type` is not number, integer or string.
    UnsupportedArrayItem { found: Option<String> },
    /// The normalized name collides with an earlier parameter.
    DuplicateName { name: String },
    /// Nesting exceeded the configured depth.
    DepthExceeded { max_depth: usize },
    /// A default value is not one of the select options.
    InvalidDefault { value: String },
    /// A media-type choice was expected but no enumeration was found.
    MissingEnum,
    /// A `required` field has no matching entry in `properties`.
    MissingProperty { property: String },
    /// An `outputTransmission` entry is neither `value` nor `reference`.
    UnknownTransmissionMode { value: String },
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}
