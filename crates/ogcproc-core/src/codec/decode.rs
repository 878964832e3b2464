//! Decoding of submitted `key value` pairs into an [`Invocation`].

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, warn};

use super::is_unset;
use crate::error::DecodeError;
use crate::naming::{
    is_array_key, is_reserved_key, option_key, restore_option_value, PREFER_KEY, PROCESS_KEY,
    RESPONSE_KEY, TRANSMISSION_PREFIX,
};
use crate::param::{
    ArrayItem, ArrayItemKind, CompiledTool, Numeric, OutputSpec, ParameterKind, ParameterSpec,
};
use crate::payload::{
    ExecutionPayload, Invocation, MaterializationTarget, OutputFormat, OutputRequest, Prefer,
    ResponseType, TransmissionMode,
};

/// Submitted arguments, keyed by form name, in submission order.
pub type FlatArguments = IndexMap<String, String>;

/// Pair up alternating `key value` tokens.
///
/// A key given twice keeps its last value.
pub fn parse_tokens<I, S>(tokens: I) -> Result<FlatArguments, DecodeError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
    if tokens.len() % 2 != 0 {
        return Err(DecodeError::OddArgumentCount(tokens.len()));
    }

    let mut args = FlatArguments::with_capacity(tokens.len() / 2);
    let mut iter = tokens.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        if let Some(previous) = args.insert(key.clone(), value) {
            warn!(
                key = %key,
                previous = %previous,
                "argument given more than once, keeping the last value"
            );
        }
    }
    Ok(args)
}

/// Rebuild the execution request described by `args`.
///
/// `tool` is the compiled metadata of the process the arguments were
/// generated for; it decides how each value is typed.
pub fn decode(args: &FlatArguments, tool: &CompiledTool) -> Result<Invocation, DecodeError> {
    let process_id = args
        .get(PROCESS_KEY)
        .ok_or_else(|| DecodeError::MissingArgument(PROCESS_KEY.to_string()))?
        .clone();
    if process_id != tool.process_id {
        warn!(
            given = %process_id,
            compiled = %tool.process_id,
            "process id differs from the compiled tool"
        );
    }

    let prefer: Prefer = choice(args, PREFER_KEY, "a Prefer header value")?.unwrap_or_default();
    let response: ResponseType =
        choice(args, RESPONSE_KEY, "'raw' or 'document'")?.unwrap_or_default();

    let mut consumed: HashSet<&str> = HashSet::new();
    let mut inputs = Map::new();
    for spec in &tool.inputs {
        if let Some(value) = decode_input(spec, args, &mut consumed)? {
            inputs.insert(spec.source_name.clone(), value);
        }
    }

    for (key, value) in args {
        if is_reserved_key(key) || consumed.contains(key.as_str()) {
            continue;
        }
        warn!(key = %key, "argument matches no compiled parameter, passing it through as text");
        if !is_unset(value) {
            inputs.insert(key.clone(), Value::String(value.clone()));
        }
    }

    let (outputs, targets) = decode_outputs(args, tool)?;

    Ok(Invocation {
        process_id,
        prefer,
        payload: ExecutionPayload {
            inputs,
            outputs,
            response,
        },
        targets,
    })
}

fn choice<T: FromStr>(
    args: &FlatArguments,
    key: &str,
    expected: &str,
) -> Result<Option<T>, DecodeError> {
    match args.get(key) {
        Some(raw) if !is_unset(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, raw, expected)),
        _ => Ok(None),
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> DecodeError {
    DecodeError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Types one submitted input by its compiled kind. Text values are passed
/// through verbatim, underscores included; only select values are restored.
fn decode_input<'a>(
    spec: &'a ParameterSpec,
    args: &FlatArguments,
    consumed: &mut HashSet<&'a str>,
) -> Result<Option<Value>, DecodeError> {
    let raw = args.get(&spec.name).map(String::as_str);
    if raw.is_some() {
        consumed.insert(spec.name.as_str());
    }
    let raw = raw.filter(|value| !is_unset(value));

    let value = match (&spec.kind, raw) {
        (ParameterKind::ObjectSection { fields }, _) => {
            return decode_object(fields, args, consumed);
        }
        (_, None) => {
            if !spec.nullable {
                debug!(parameter = %spec.name, "no value submitted, omitting");
            }
            return Ok(None);
        }
        (ParameterKind::Text { .. }, Some(raw)) => Value::String(raw.to_string()),
        (
            ParameterKind::Integer { .. }
            | ParameterKind::OptionalNumeric {
                wrapped: Numeric::Integer { .. },
                ..
            },
            Some(raw),
        ) => parse_integer(&spec.name, raw)?,
        (
            ParameterKind::Float { .. }
            | ParameterKind::OptionalNumeric {
                wrapped: Numeric::Float { .. },
                ..
            },
            Some(raw),
        ) => parse_float(&spec.name, raw)?,
        (ParameterKind::Select { boolean: true, .. }, Some(raw)) => {
            Value::Bool(parse_bool(&spec.name, raw)?)
        }
        (ParameterKind::Select { options, .. }, Some(raw)) => {
            Value::String(select_value(&spec.name, options, raw))
        }
        (ParameterKind::DataFile { is_array, .. }, Some(raw)) => {
            read_hrefs(spec, *is_array, raw, args)?
        }
        (ParameterKind::ArraySection { item, .. }, Some(raw)) => {
            decode_array(&spec.name, item, raw)?
        }
    };
    Ok(Some(value))
}

fn decode_object<'a>(
    fields: &'a [ParameterSpec],
    args: &FlatArguments,
    consumed: &mut HashSet<&'a str>,
) -> Result<Option<Value>, DecodeError> {
    let mut object = Map::new();
    for field in fields {
        if let Some(value) = decode_input(field, args, consumed)? {
            object.insert(field.source_name.clone(), value);
        }
    }
    Ok((!object.is_empty()).then_some(Value::Object(object)))
}

fn parse_integer(key: &str, raw: &str) -> Result<Value, DecodeError> {
    raw.trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|_| invalid(key, raw, "an integer"))
}

fn parse_float(key: &str, raw: &str) -> Result<Value, DecodeError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| invalid(key, raw, "a finite number"))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, DecodeError> {
    match raw.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(invalid(key, raw, "'true' or 'false'")),
    }
}

/// Map a submitted option key back to the value the process declared.
fn select_value(key: &str, options: &IndexMap<String, String>, raw: &str) -> String {
    if let Some(label) = options.get(raw) {
        return label.clone();
    }
    if options.values().any(|label| label == raw) {
        return raw.to_string();
    }
    let restored = restore_option_value(raw);
    warn!(parameter = %key, value = %raw, restored = %restored, "value matches no select option");
    restored
}

/// Read a newline-separated href list and wrap each line as `{"href": …}`.
///
/// The `isArray<name>` flag decides between a single object and an array;
/// without a flag the compiled array-ness applies.
fn read_hrefs(
    spec: &ParameterSpec,
    compiled_is_array: bool,
    path: &str,
    args: &FlatArguments,
) -> Result<Value, DecodeError> {
    let flag_key = is_array_key(&spec.name);
    let as_array = match args.get(&flag_key) {
        Some(flag) => parse_bool(&flag_key, flag)?,
        None => compiled_is_array,
    };

    let path = PathBuf::from(path.trim());
    let content = fs::read_to_string(&path).map_err(|source| DecodeError::InputFile {
        key: spec.name.clone(),
        path: path.clone(),
        source,
    })?;
    let hrefs: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if as_array {
        if hrefs.is_empty() {
            warn!(parameter = %spec.name, path = %path.display(), "href list is empty");
        }
        return Ok(Value::Array(
            hrefs.iter().map(|href| json!({ "href": href })).collect(),
        ));
    }

    let first = hrefs.first().ok_or_else(|| DecodeError::EmptyHrefList {
        key: spec.name.clone(),
        path: path.clone(),
    })?;
    if hrefs.len() > 1 {
        warn!(
            parameter = %spec.name,
            count = hrefs.len(),
            "single-file input lists several hrefs, using the first"
        );
    }
    Ok(json!({ "href": first }))
}

fn decode_array(key: &str, item: &ArrayItem, raw: &str) -> Result<Value, DecodeError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match item.kind {
            ArrayItemKind::Integer => parse_integer(key, part),
            ArrayItemKind::Float => parse_float(key, part),
            ArrayItemKind::Text => Ok(Value::String(part.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

type DecodedOutputs = (IndexMap<String, OutputRequest>, Vec<MaterializationTarget>);

fn decode_outputs(
    args: &FlatArguments,
    tool: &CompiledTool,
) -> Result<DecodedOutputs, DecodeError> {
    let mut outputs = IndexMap::new();
    let mut targets = Vec::new();

    for key in args.keys() {
        if let Some(output) = key.strip_prefix(TRANSMISSION_PREFIX) {
            if tool.output(output).is_none() {
                warn!(key = %key, "transmission mode for an undeclared output, ignoring");
            }
        }
    }

    for output in &tool.outputs {
        let mode_key = output.transmission_key();
        let Some(requested) = args.get(&mode_key) else {
            debug!(output = %output.name, "no transmission mode submitted, output not requested");
            continue;
        };
        let requested = if is_unset(requested) {
            TransmissionMode::default()
        } else {
            requested
                .trim()
                .parse::<TransmissionMode>()
                .map_err(|_| invalid(&mode_key, requested, "'value' or 'reference'"))?
        };

        let media_type = args
            .get(&output.format_key())
            .filter(|value| !is_unset(value))
            .map(|value| resolve_media_type(output, value.trim()));

        let transmission_mode = match &media_type {
            Some(media) if media.contains("image") => {
                if requested != TransmissionMode::Reference {
                    debug!(
                        output = %output.name,
                        media = %media,
                        "image output forced to reference"
                    );
                }
                TransmissionMode::Reference
            }
            _ => requested,
        };

        outputs.insert(
            output.source_name.clone(),
            OutputRequest {
                transmission_mode,
                format: media_type.clone().map(|media_type| OutputFormat { media_type }),
            },
        );

        match args.get(&output.target_key()).filter(|v| !is_unset(v)) {
            Some(path) => targets.push(MaterializationTarget {
                output_name: output.source_name.clone(),
                file_path: PathBuf::from(path.trim()),
                transmission_mode,
                media_type,
            }),
            None => warn!(
                output = %output.name,
                "no target path submitted, output will not be written"
            ),
        }
    }

    Ok((outputs, targets))
}

/// The declared media type a submitted `outputType_<name>` value stands for.
fn resolve_media_type(output: &OutputSpec, submitted: &str) -> String {
    output
        .media_types
        .iter()
        .find(|media| media.as_str() == submitted || option_key(media) == submitted)
        .cloned()
        .unwrap_or_else(|| {
            warn!(
                output = %output.name,
                value = %submitted,
                "media type is not declared for this output"
            );
            submitted.to_string()
        })
}
