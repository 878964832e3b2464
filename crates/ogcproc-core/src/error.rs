//! Error types for descriptor compilation and argument decoding.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to compile a process description.
///
/// Only document-level problems are errors. Individual entries the compiler
/// cannot classify are reported as [`crate::Diagnostic`]s instead.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Process description error at {path}: {message}")]
    DescriptionError { path: String, message: String },
}

/// Failure to turn submitted form arguments into an execution payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("The number of arguments must be even (got {0})")]
    OddArgumentCount(usize),

    #[error("Missing required argument '{0}'")]
    MissingArgument(String),

    #[error("Invalid value '{value}' for '{key}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("Failed to read input file {path} for '{key}': {source}")]
    InputFile {
        key: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input file {path} for '{key}' contains no href")]
    EmptyHrefList { key: String, path: PathBuf },
}

/// A string that does not name any variant of a closed choice
/// (transmission mode, response type, prefer header).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}
