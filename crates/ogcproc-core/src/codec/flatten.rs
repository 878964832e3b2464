//! Flattening of a compiled tool into `key value` pairs.

use serde::{Deserialize, Serialize};

use crate::config::CompileOptions;
use crate::naming::{is_array_key, PROCESS_KEY};
use crate::param::{CompiledTool, ParameterKind, ParameterSpec};

/// One `key value` pair of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatArgument {
    pub key: String,
    pub value: String,
}

impl FlatArgument {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The ordered invocation pairs of `tool`.
///
/// Values are `$`-placeholders dotted through the enclosing sections, except
/// for the process id and the `isArray<name>` flags, which are literal.
pub fn flatten(tool: &CompiledTool) -> Vec<FlatArgument> {
    let mut args = vec![FlatArgument::new(PROCESS_KEY, tool.process_id.as_str())];

    for input in &tool.inputs {
        flatten_input(input, &[], &mut args);
    }

    for control in &tool.controls {
        let name = control.parameter.name.as_str();
        args.push(FlatArgument::new(name, placeholder(&[&control.name, name])));
    }

    for output in &tool.outputs {
        let section = output.section_name();
        if let Some(format) = &output.format {
            args.push(FlatArgument::new(
                format.name.as_str(),
                placeholder(&[&section, &format.name]),
            ));
        }
        args.push(FlatArgument::new(
            output.transmission.name.as_str(),
            placeholder(&[&section, &output.transmission.name]),
        ));
        args.push(FlatArgument::new(
            output.target_key(),
            placeholder(&[&output.dataset.name]),
        ));
    }

    args
}

fn flatten_input(spec: &ParameterSpec, scope: &[&str], args: &mut Vec<FlatArgument>) {
    let scoped = |leaf: &[&str]| {
        let path: Vec<&str> = scope.iter().chain(leaf).copied().collect();
        placeholder(&path)
    };

    match &spec.kind {
        ParameterKind::ObjectSection { fields } => {
            let inner: Vec<&str> = scope
                .iter()
                .copied()
                .chain(std::iter::once(spec.name.as_str()))
                .collect();
            for field in fields {
                flatten_input(field, &inner, args);
            }
        }
        ParameterKind::OptionalNumeric { .. } => {
            let conditional = spec.conditional_name();
            args.push(FlatArgument::new(
                spec.name.as_str(),
                scoped(&[&conditional, &spec.name]),
            ));
        }
        ParameterKind::DataFile { is_array, .. } => {
            args.push(FlatArgument::new(spec.name.as_str(), scoped(&[&spec.name])));
            let flag = if *is_array { "True" } else { "False" };
            args.push(FlatArgument::new(is_array_key(&spec.name), flag));
        }
        ParameterKind::Text { .. }
        | ParameterKind::Select { .. }
        | ParameterKind::Integer { .. }
        | ParameterKind::Float { .. }
        | ParameterKind::ArraySection { .. } => {
            args.push(FlatArgument::new(spec.name.as_str(), scoped(&[&spec.name])));
        }
    }
}

fn placeholder(path: &[&str]) -> String {
    format!("${}", path.join("."))
}

/// Render `executable key 'value' key 'value' …` for `tool`.
pub fn command_template(tool: &CompiledTool, options: &CompileOptions) -> String {
    let mut rendered = options.executable.clone();
    for arg in flatten(tool) {
        rendered.push(' ');
        rendered.push_str(&arg.key);
        rendered.push(' ');
        rendered.push_str(&single_quote(&arg.value));
    }
    rendered
}

fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
