//! Compiled parameter model.
//!
//! A [`CompiledTool`] is produced once per process description and is
//! immutable afterwards. It is serialized next to the generated descriptor so
//! the argument decoder can read it back at invocation time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;
use crate::naming::{output_data_key, output_type_key, transmission_key};

/// One form parameter.
///
/// `name` is unique within a compiled tool and already normalized;
/// `source_name` is the identifier exactly as the process description spells it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    pub kind: ParameterKind,
}

/// Closed set of parameter kinds. Every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Free text. `required` asks the form layer to reject an empty field.
    Text {
        default: Option<String>,
        required: bool,
    },
    /// Choice among options, keyed by the submitted form value and mapped to
    /// the display label. For enum-derived selects the label is the original
    /// enumeration value.
    Select {
        options: IndexMap<String, String>,
        default: Option<String>,
        /// Built from a `boolean` schema; decodes to a JSON boolean.
        #[serde(default)]
        boolean: bool,
    },
    Integer {
        default: Option<i64>,
    },
    Float {
        default: Option<f64>,
    },
    /// Yes/no gate around a nullable numeric field.
    OptionalNumeric {
        wrapped: Numeric,
        default_present: bool,
    },
    /// Text file listing one href per line.
    DataFile {
        media_types: Vec<String>,
        is_array: bool,
    },
    /// Repeated primitive values with optional item-count bounds.
    ArraySection {
        item: ArrayItem,
        min: Option<u64>,
        max: Option<u64>,
    },
    /// Object input; only the schema's required fields are compiled.
    ObjectSection {
        fields: Vec<ParameterSpec>,
    },
}

/// The numeric field inside an [`ParameterKind::OptionalNumeric`] gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Numeric {
    Integer { default: Option<i64> },
    Float { default: Option<f64> },
}

/// The single repeated child of an array section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub name: String,
    pub kind: ArrayItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayItemKind {
    Float,
    Integer,
    Text,
}

impl ParameterSpec {
    /// Name of the conditional wrapping an optional numeric parameter.
    pub fn conditional_name(&self) -> String {
        format!("cond_{}", self.name)
    }

    /// Name of the yes/no select inside the conditional.
    pub fn conditional_select_name(&self) -> String {
        format!("select_{}", self.name)
    }
}

/// Compiled form of one declared output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub name: String,
    pub source_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Legal media types; empty means the output has no format choice.
    pub media_types: Vec<String>,
    /// `outputType_<name>` select, present when `media_types` is non-empty.
    pub format: Option<ParameterSpec>,
    /// `transmissionMode_<name>` select, present for every output.
    pub transmission: ParameterSpec,
    pub dataset: OutputDataset,
}

impl OutputSpec {
    pub fn section_name(&self) -> String {
        format!("OutputSection_{}", self.name)
    }

    pub fn format_key(&self) -> String {
        output_type_key(&self.name)
    }

    pub fn transmission_key(&self) -> String {
        transmission_key(&self.name)
    }

    pub fn target_key(&self) -> String {
        output_data_key(&self.name)
    }
}

/// The dataset an output is written to, with its format-switching rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDataset {
    pub name: String,
    pub default_format: String,
    pub format_rules: Vec<FormatRule>,
}

/// "When `input` equals `value`, the dataset's format becomes `format`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRule {
    pub input: String,
    pub value: String,
    pub format: String,
}

/// A form section holding one execution-control parameter
/// (the `Prefer` choice or the response type).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSection {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub parameter: ParameterSpec,
}

/// The full compiled descriptor for one remote process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledTool {
    pub process_id: String,
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub inputs: Vec<ParameterSpec>,
    pub outputs: Vec<OutputSpec>,
    pub controls: Vec<ControlSection>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledTool {
    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }
}
