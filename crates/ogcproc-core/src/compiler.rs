//! Parameter compiler: turns a process description's `inputs` and `outputs`
//! into the typed parameter tree.
//!
//! Kind selection for an input, first match wins:
//!
//! | Check                                   | Kind                                |
//! |-----------------------------------------|-------------------------------------|
//! | `type: string` with `enum`              | `Select`                            |
//! | `type: string`                          | `Text`                              |
//! | `type: integer`                         | `Integer` (`OptionalNumeric` if nullable) |
//! | `type: number`                          | `Float` (`OptionalNumeric` if nullable)   |
//! | `type: boolean`                         | `Select` over `true`/`false`        |
//! | `extended-schema` present               | `DataFile`                          |
//! | `type: object`                          | `ObjectSection` (required fields)   |
//! | anything else                           | skipped with a diagnostic           |
//!
//! All per-run state (claimed names, diagnostics) lives in a context object
//! owned by one [`compile`] call.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::array_bounds::ArrayBounds;
use crate::config::CompileOptions;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::enum_extract::media_types;
use crate::error::CompileError;
use crate::naming::{
    is_reserved_key, media_suffix, normalize_identifier, option_key, output_data_key,
    output_type_key, tool_id, transmission_key, PREFER_KEY, PROCESS_KEY, RESPONSE_KEY,
};
use crate::param::{
    ArrayItem, ArrayItemKind, CompiledTool, ControlSection, FormatRule, Numeric, OutputDataset,
    OutputSpec, ParameterKind, ParameterSpec,
};
use crate::payload::{Prefer, ResponseType, TransmissionMode};
use crate::schema_utils::{as_integer, build_path, is_nullable, schema_type, value_to_string};

const NULL: Value = Value::Null;

/// Result of compiling an input map and an output map.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub inputs: Vec<ParameterSpec>,
    pub outputs: Vec<OutputSpec>,
    pub controls: Vec<ControlSection>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile a whole process description document.
///
/// Reads `id`, `title`, `description`, `version`, `inputs`, `outputs` and
/// `outputTransmission`. Only a description that is not an object, lacks an
/// `id`, or has non-object `inputs`/`outputs` is an error; everything else
/// degrades to diagnostics.
pub fn compile_process(
    description: &Value,
    options: &CompileOptions,
) -> Result<CompiledTool, CompileError> {
    let obj = description
        .as_object()
        .ok_or_else(|| CompileError::DescriptionError {
            path: "#".to_string(),
            message: "process description must be a JSON object".to_string(),
        })?;

    let process_id = obj.get("id").and_then(Value::as_str).ok_or_else(|| {
        CompileError::DescriptionError {
            path: "#/id".to_string(),
            message: "process description has no string `id`".to_string(),
        }
    })?;

    let empty = Map::new();
    let inputs = object_member(obj, "inputs")?.unwrap_or(&empty);
    let outputs = object_member(obj, "outputs")?.unwrap_or(&empty);

    let mut diagnostics = Vec::new();
    let modes = transmission_modes(obj.get("outputTransmission"), &mut diagnostics);

    let compilation = compile(inputs, outputs, &modes, options);
    diagnostics.extend(compilation.diagnostics);

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(CompiledTool {
        process_id: process_id.to_string(),
        tool_id: tool_id(process_id),
        title: text("title"),
        description: text("description"),
        version: text("version"),
        inputs: compilation.inputs,
        outputs: compilation.outputs,
        controls: compilation.controls,
        diagnostics,
    })
}

/// Compile input and output maps against the offered transmission modes.
pub fn compile(
    inputs: &Map<String, Value>,
    outputs: &Map<String, Value>,
    transmission_modes: &[TransmissionMode],
    options: &CompileOptions,
) -> Compilation {
    let mut ctx = CompileContext::new(options);

    let compiled_inputs = inputs
        .iter()
        .filter_map(|(name, info)| ctx.compile_input(name, info))
        .collect();
    let controls = control_sections();
    let compiled_outputs = outputs
        .iter()
        .filter_map(|(name, info)| ctx.compile_output(name, info, transmission_modes))
        .collect();

    Compilation {
        inputs: compiled_inputs,
        outputs: compiled_outputs,
        controls,
        diagnostics: ctx.diagnostics,
    }
}

fn object_member<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, CompileError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(CompileError::DescriptionError {
            path: build_path("#", &[key]),
            message: format!("`{key}` must be an object keyed by identifier"),
        }),
    }
}

/// Parse `outputTransmission`. Absent or empty falls back to both modes.
fn transmission_modes(
    declared: Option<&Value>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<TransmissionMode> {
    let mut modes = Vec::new();
    for (i, entry) in declared
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
    {
        let raw = value_to_string(entry);
        match raw.parse::<TransmissionMode>() {
            Ok(mode) if !modes.contains(&mode) => modes.push(mode),
            Ok(_) => {}
            Err(_) => {
                let path = build_path("#/outputTransmission", &[&i.to_string()]);
                warn!(%path, value = %raw, "ignoring unknown transmission mode");
                diagnostics.push(Diagnostic::new(
                    path,
                    DiagnosticKind::UnknownTransmissionMode { value: raw.clone() },
                    format!("Unknown transmission mode '{raw}'"),
                ));
            }
        }
    }
    if modes.is_empty() {
        modes = vec![TransmissionMode::Value, TransmissionMode::Reference];
    }
    modes
}

// ---------------------------------------------------------------------------
// Compilation context
// ---------------------------------------------------------------------------

/// Primitive schema types that map directly onto a single form field.
#[derive(Debug, Clone, Copy)]
enum Scalar {
    String,
    Integer,
    Number,
    Boolean,
}

impl Scalar {
    fn from_type(ty: &str) -> Option<Self> {
        match ty {
            "string" => Some(Scalar::String),
            "integer" => Some(Scalar::Integer),
            "number" => Some(Scalar::Number),
            "boolean" => Some(Scalar::Boolean),
            _ => None,
        }
    }
}

struct CompileContext<'a> {
    options: &'a CompileOptions,
    /// Every form name handed out so far (inputs, fields, output selects).
    claimed: HashSet<String>,
    /// Output identifiers; outputs may reuse an input's identifier.
    output_names: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CompileContext<'a> {
    fn new(options: &'a CompileOptions) -> Self {
        let claimed = [PROCESS_KEY, PREFER_KEY, RESPONSE_KEY]
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            options,
            claimed,
            output_names: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn diagnose(&mut self, path: &str, kind: DiagnosticKind, message: String) {
        warn!(%path, "{message}");
        self.diagnostics.push(Diagnostic::new(path, kind, message));
    }

    /// True (with a diagnostic) when an input name cannot be handed out.
    fn is_taken(&mut self, name: &str, path: &str) -> bool {
        self.collides(name, path, is_reserved_key(name))
    }

    /// Like [`Self::is_taken`] for generated control keys, which carry a
    /// reserved prefix by construction.
    fn is_claimed(&mut self, name: &str, path: &str) -> bool {
        self.collides(name, path, false)
    }

    fn collides(&mut self, name: &str, path: &str, reserved: bool) -> bool {
        if reserved || self.claimed.contains(name) {
            self.diagnose(
                path,
                DiagnosticKind::DuplicateName {
                    name: name.to_string(),
                },
                format!("Parameter name '{name}' is already in use; entry skipped"),
            );
            return true;
        }
        false
    }

    fn claim(&mut self, name: &str) {
        self.claimed.insert(name.to_string());
    }

    // -- Inputs --------------------------------------------------------------

    fn compile_input(&mut self, source_name: &str, info: &Value) -> Option<ParameterSpec> {
        let name = normalize_identifier(source_name);
        let path = build_path("#/inputs", &[source_name]);
        let schema = info.get("schema").unwrap_or(&NULL);
        let extended = info.get("extended-schema").filter(|v| v.is_object());
        let (title, mut description) = labels(info, &name);

        if self.is_taken(&name, &path) {
            return None;
        }

        let ty = schema_type(schema);
        let mut nullable = is_nullable(schema);
        let kind = match (ty.and_then(Scalar::from_type), extended) {
            (Some(scalar), _) => self.scalar_kind(scalar, schema, &path, nullable),
            (None, Some(ext)) => {
                nullable = is_nullable(ext);
                let kind = self.data_file_kind(ext, &build_path(&path, &["extended-schema"]));
                if let ParameterKind::DataFile { media_types, .. } = &kind {
                    description = Some(allowed_types_help(description, media_types));
                }
                kind
            }
            (None, None) if ty == Some("object") => {
                self.object_kind(&name, schema, &build_path(&path, &["schema"]), 0)?
            }
            (None, None) => {
                self.diagnose(
                    &path,
                    DiagnosticKind::UnsupportedType {
                        found: ty.map(str::to_string),
                    },
                    format!(
                        "Parameter '{source_name}' has unsupported type '{}'",
                        ty.unwrap_or("<none>")
                    ),
                );
                return None;
            }
        };

        self.claim(&name);
        debug!(%path, name = %name, "compiled input");
        Some(ParameterSpec {
            name,
            source_name: source_name.to_string(),
            title: Some(title),
            description,
            nullable,
            kind,
        })
    }

    fn scalar_kind(
        &mut self,
        scalar: Scalar,
        schema: &Value,
        path: &str,
        nullable: bool,
    ) -> ParameterKind {
        match scalar {
            Scalar::String => self.string_kind(schema, path, nullable),
            Scalar::Integer => {
                let default = schema.get("default").and_then(as_integer);
                if nullable {
                    ParameterKind::OptionalNumeric {
                        wrapped: Numeric::Integer { default },
                        default_present: default.is_some(),
                    }
                } else {
                    ParameterKind::Integer { default }
                }
            }
            Scalar::Number => {
                let default = schema.get("default").and_then(Value::as_f64);
                if nullable {
                    ParameterKind::OptionalNumeric {
                        wrapped: Numeric::Float { default },
                        default_present: default.is_some(),
                    }
                } else {
                    ParameterKind::Float { default }
                }
            }
            Scalar::Boolean => self.boolean_kind(schema, path),
        }
    }

    fn string_kind(&mut self, schema: &Value, path: &str, nullable: bool) -> ParameterKind {
        let raw_default = schema.get("default").map(value_to_string);
        match schema
            .get("enum")
            .and_then(Value::as_array)
            .filter(|values| !values.is_empty())
        {
            Some(values) => {
                let options: IndexMap<String, String> = values
                    .iter()
                    .map(value_to_string)
                    .map(|value| (option_key(&value), value))
                    .collect();
                let default = self.select_default(raw_default, &options, path);
                ParameterKind::Select {
                    options,
                    default,
                    boolean: false,
                }
            }
            None => ParameterKind::Text {
                default: raw_default,
                required: !nullable,
            },
        }
    }

    fn boolean_kind(&mut self, schema: &Value, path: &str) -> ParameterKind {
        let options: IndexMap<String, String> = ["true", "false"]
            .into_iter()
            .map(|v| (v.to_string(), v.to_string()))
            .collect();
        // The only place a native boolean becomes a string.
        let raw_default = schema.get("default").map(|value| match value {
            Value::Bool(true) => "true".to_string(),
            Value::Bool(false) => "false".to_string(),
            other => value_to_string(other),
        });
        let default = self.select_default(raw_default, &options, path);
        ParameterKind::Select {
            options,
            default,
            boolean: true,
        }
    }

    /// Normalize a select default and check it against the option keys.
    fn select_default(
        &mut self,
        raw: Option<String>,
        options: &IndexMap<String, String>,
        path: &str,
    ) -> Option<String> {
        let key = option_key(&raw?);
        if options.contains_key(&key) {
            Some(key)
        } else {
            self.diagnose(
                path,
                DiagnosticKind::InvalidDefault { value: key.clone() },
                format!("Default '{key}' is not one of the select options; ignored"),
            );
            None
        }
    }

    fn data_file_kind(&mut self, extended: &Value, path: &str) -> ParameterKind {
        let is_array = schema_type(extended) == Some("array");
        let source = if is_array {
            extended.get("items").unwrap_or(&NULL)
        } else {
            extended
        };
        let media_types = media_types(source, self.options.max_depth);
        if media_types.is_empty() {
            self.diagnose(
                path,
                DiagnosticKind::MissingEnum,
                "Extended schema lists no media types".to_string(),
            );
        }
        ParameterKind::DataFile {
            media_types,
            is_array,
        }
    }

    /// Compile the required fields of an object schema.
    ///
    /// Optional members are not compiled.
    fn object_kind(
        &mut self,
        name: &str,
        schema: &Value,
        path: &str,
        depth: usize,
    ) -> Option<ParameterKind> {
        if depth >= self.options.max_depth {
            let max_depth = self.options.max_depth;
            self.diagnose(
                path,
                DiagnosticKind::DepthExceeded { max_depth },
                format!("Object nesting exceeds the maximum depth of {max_depth}"),
            );
            return None;
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .collect();

        let mut fields = Vec::with_capacity(required.len());
        for field in &required {
            let field_path = build_path(path, &["properties", field]);
            let Some(field_schema) = properties.and_then(|p| p.get(*field)) else {
                self.diagnose(
                    &field_path,
                    DiagnosticKind::MissingProperty {
                        property: field.to_string(),
                    },
                    format!("Required field '{field}' has no schema in `properties`"),
                );
                continue;
            };
            if let Some(spec) = self.compile_field(name, field, field_schema, &field_path, depth) {
                fields.push(spec);
            }
        }

        for optional in properties
            .into_iter()
            .flat_map(|p| p.keys())
            .filter(|key| !required.contains(&key.as_str()))
        {
            debug!(%path, field = %optional, "optional object field not compiled");
        }

        Some(ParameterKind::ObjectSection { fields })
    }

    fn compile_field(
        &mut self,
        parent: &str,
        field: &str,
        schema: &Value,
        path: &str,
        depth: usize,
    ) -> Option<ParameterSpec> {
        let name = format!("{parent}_{}", normalize_identifier(field));
        if self.is_taken(&name, path) {
            return None;
        }

        let ty = schema_type(schema);
        let nullable = is_nullable(schema);
        let kind = match ty {
            Some("array") => self.array_kind(schema, path)?,
            Some("object") => self.object_kind(&name, schema, path, depth + 1)?,
            Some(other) if Scalar::from_type(other).is_some() => {
                let scalar = Scalar::from_type(other)?;
                self.scalar_kind(scalar, schema, path, nullable)
            }
            other => {
                self.diagnose(
                    path,
                    DiagnosticKind::UnsupportedType {
                        found: other.map(str::to_string),
                    },
                    format!(
                        "Field '{field}' has unsupported type '{}'",
                        other.unwrap_or("<none>")
                    ),
                );
                return None;
            }
        };

        self.claim(&name);
        Some(ParameterSpec {
            name,
            source_name: field.to_string(),
            title: Some(field.to_string()),
            description: schema
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            nullable,
            kind,
        })
    }

    fn array_kind(&mut self, schema: &Value, path: &str) -> Option<ParameterKind> {
        let item_type = schema.get("items").and_then(schema_type);
        let (kind, item_name) = match item_type {
            Some("number") => (ArrayItemKind::Float, "floatData".to_string()),
            Some("integer") => (ArrayItemKind::Integer, "integerData".to_string()),
            Some(ty @ "string") => (ArrayItemKind::Text, format!("{ty}Data")),
            other => {
                self.diagnose(
                    path,
                    DiagnosticKind::UnsupportedArrayItem {
                        found: other.map(str::to_string),
                    },
                    format!(
                        "Array item type '{}' is not supported",
                        other.unwrap_or("<none>")
                    ),
                );
                return None;
            }
        };

        let bounds = ArrayBounds::resolve(schema);
        Some(ParameterKind::ArraySection {
            item: ArrayItem {
                name: item_name,
                kind,
            },
            min: bounds.min_items(),
            max: bounds.max_items(),
        })
    }

    // -- Outputs -------------------------------------------------------------

    fn compile_output(
        &mut self,
        source_name: &str,
        info: &Value,
        modes: &[TransmissionMode],
    ) -> Option<OutputSpec> {
        let name = normalize_identifier(source_name);
        let path = build_path("#/outputs", &[source_name]);
        if !self.output_names.insert(name.clone()) {
            self.diagnose(
                &path,
                DiagnosticKind::DuplicateName { name: name.clone() },
                format!("Output name '{name}' is already in use; entry skipped"),
            );
            return None;
        }

        let schema = info.get("schema").unwrap_or(&NULL);
        let extended = info.get("extended-schema").filter(|v| v.is_object());
        let (title, description) = labels(info, &name);
        let format_key = output_type_key(&name);
        let mode_key = transmission_key(&name);
        if self.is_claimed(&format_key, &path) || self.is_claimed(&mode_key, &path) {
            return None;
        }

        let ty = schema_type(schema);
        let declared_enum = schema
            .get("enum")
            .and_then(Value::as_array)
            .filter(|values| !values.is_empty());

        let (options, media): (IndexMap<String, String>, Vec<String>) =
            match (ty, declared_enum, extended) {
                (Some("string"), Some(values), _) => {
                    let media: Vec<String> = values.iter().map(value_to_string).collect();
                    let options = media.iter().map(|v| (option_key(v), v.clone())).collect();
                    (options, media)
                }
                (_, _, Some(ext)) => {
                    let media = media_types(ext, self.options.max_depth);
                    if media.is_empty() {
                        self.diagnose(
                            &build_path(&path, &["extended-schema"]),
                            DiagnosticKind::MissingEnum,
                            format!("Output '{source_name}' lists no media types"),
                        );
                    }
                    let options = media
                        .iter()
                        .map(|m| (m.clone(), media_suffix(m).to_string()))
                        .collect();
                    (options, media)
                }
                (Some("string" | "number" | "integer" | "boolean" | "object"), _, None) => {
                    (IndexMap::new(), Vec::new())
                }
                (other, _, None) => {
                    self.diagnose(
                        &path,
                        DiagnosticKind::UnsupportedType {
                            found: other.map(str::to_string),
                        },
                        format!(
                            "Output '{source_name}' has unsupported type '{}'; no format choice",
                            other.unwrap_or("<none>")
                        ),
                    );
                    (IndexMap::new(), Vec::new())
                }
            };

        let format = (!options.is_empty()).then(|| ParameterSpec {
            name: format_key.clone(),
            source_name: source_name.to_string(),
            title: Some(title.clone()),
            description: description.clone(),
            nullable: false,
            kind: ParameterKind::Select {
                options,
                default: None,
                boolean: false,
            },
        });
        if format.is_some() {
            self.claim(&format_key);
        }

        let transmission = transmission_select(&mode_key, source_name, modes);
        self.claim(&mode_key);

        let dataset = output_dataset(&name, &format_key, &media);
        debug!(%path, name = %name, formats = media.len(), "compiled output");

        Some(OutputSpec {
            name,
            source_name: source_name.to_string(),
            title: Some(title),
            description,
            media_types: media,
            format,
            transmission,
            dataset,
        })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Label and help text of an entry. The label is the form name; the help
/// joins title and description when they differ.
fn labels(info: &Value, name: &str) -> (String, Option<String>) {
    let title = info.get("title").and_then(Value::as_str);
    let description = info.get("description").and_then(Value::as_str);
    let help = match (title, description) {
        (Some(t), Some(d)) if t != d => Some(format!("{t} {d}")),
        (_, Some(d)) => Some(d.to_string()),
        (Some(t), None) => Some(t.to_string()),
        (None, None) => None,
    };
    (name.to_string(), help)
}

fn allowed_types_help(description: Option<String>, media_types: &[String]) -> String {
    let suffixes: Vec<&str> = media_types.iter().map(|m| media_suffix(m)).collect();
    let note = format!(
        "The following data types are allowed in the txt file: {}",
        suffixes.join(", ")
    );
    match description {
        Some(d) => format!("{d} {note}"),
        None => note,
    }
}

fn transmission_select(
    key: &str,
    source_name: &str,
    modes: &[TransmissionMode],
) -> ParameterSpec {
    let options = modes
        .iter()
        .map(|m| (m.as_str().to_string(), m.as_str().to_string()))
        .collect();
    let default = if modes.contains(&TransmissionMode::Reference) {
        TransmissionMode::Reference
    } else {
        modes.first().copied().unwrap_or_default()
    };
    ParameterSpec {
        name: key.to_string(),
        source_name: source_name.to_string(),
        title: Some("Choose the transmission mode".to_string()),
        description: None,
        nullable: false,
        kind: ParameterKind::Select {
            options,
            default: Some(default.as_str().to_string()),
            boolean: false,
        },
    }
}

fn output_dataset(name: &str, format_key: &str, media: &[String]) -> OutputDataset {
    let default_format = media
        .first()
        .map(|m| media_suffix(m).to_string())
        .unwrap_or_else(|| "txt".to_string());

    let mut format_rules = Vec::new();
    if !media.is_empty() {
        format_rules.push(FormatRule {
            input: RESPONSE_KEY.to_string(),
            value: ResponseType::Document.as_str().to_string(),
            format: "txt".to_string(),
        });
        format_rules.extend(media.iter().skip(1).map(|m| FormatRule {
            input: format_key.to_string(),
            value: option_key(m),
            format: media_suffix(m).to_string(),
        }));
    }

    OutputDataset {
        name: output_data_key(name),
        default_format,
        format_rules,
    }
}

fn control_sections() -> Vec<ControlSection> {
    let prefer_options = Prefer::ALL
        .iter()
        .map(|p| (p.header_value().to_string(), p.header_value().to_string()))
        .collect();
    let response_options = [ResponseType::Raw, ResponseType::Document]
        .iter()
        .map(|r| (r.as_str().to_string(), r.as_str().to_string()))
        .collect();

    vec![
        ControlSection {
            name: "Section_prefer".to_string(),
            title: "Choose the prefer".to_string(),
            help: Some(
                "Choose between 'return=representation', 'return=minimal', and \
                 'respond-async;return=representation'. Synchronous execution is the default."
                    .to_string(),
            ),
            parameter: ParameterSpec {
                name: PREFER_KEY.to_string(),
                source_name: PREFER_KEY.to_string(),
                title: Some("Prefer".to_string()),
                description: None,
                nullable: false,
                kind: ParameterKind::Select {
                    options: prefer_options,
                    default: Some(Prefer::default().header_value().to_string()),
                    boolean: false,
                },
            },
        },
        ControlSection {
            name: "Section_response".to_string(),
            title: "Choose the response type".to_string(),
            help: Some(
                "Choose 'raw' to get the raw data or 'document' for retrieving a URL. \
                 The URL can be used for workflows, while the raw data is the download of the URL."
                    .to_string(),
            ),
            parameter: ParameterSpec {
                name: RESPONSE_KEY.to_string(),
                source_name: RESPONSE_KEY.to_string(),
                title: Some("Response Type".to_string()),
                description: Some(
                    "Choose 'raw' for raw data or 'document' for document data.".to_string(),
                ),
                nullable: false,
                kind: ParameterKind::Select {
                    options: response_options,
                    default: Some(ResponseType::default().as_str().to_string()),
                    boolean: false,
                },
            },
        },
    ]
}
