//! # ogcproc-core
//!
//! Turns OGC API Processes descriptions into typed form parameters, and
//! submitted form arguments back into execution requests.
//!
//! Two directions share one naming scheme:
//!
//! - **Compile** ([`compile_process`]): walk a process description's
//!   `inputs`/`outputs` schemas and produce a [`CompiledTool`], the
//!   parameter tree a workflow form is rendered from.
//! - **Decode** ([`decode`]): take the flat `key value …` arguments such a
//!   form submits and rebuild the nested `{inputs, outputs, response}` body
//!   the remote `processes/<id>/execution` endpoint expects.
//!
//! ## Example
//!
//! ```rust
//! use ogcproc_core::{compile_process, decode, parse_tokens, CompileOptions};
//! use serde_json::json;
//!
//! let description = json!({
//!     "id": "echo",
//!     "inputs": {"message": {"schema": {"type": "string"}}},
//!     "outputs": {}
//! });
//! let tool = compile_process(&description, &CompileOptions::default()).unwrap();
//! assert_eq!(tool.inputs.len(), 1);
//!
//! let args = parse_tokens(["name", "echo", "message", "hello"]).unwrap();
//! let invocation = decode(&args, &tool).unwrap();
//! assert_eq!(invocation.payload.inputs["message"], json!("hello"));
//! ```

pub mod array_bounds;
pub mod codec;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod enum_extract;
pub mod error;
pub mod naming;
pub mod param;
pub mod payload;
pub mod schema_utils;

pub use array_bounds::ArrayBounds;
pub use codec::{command_template, decode, flatten, parse_tokens, FlatArgument, FlatArguments};
pub use compiler::{compile, compile_process, Compilation};
pub use config::CompileOptions;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use enum_extract::{extract_enum, media_types};
pub use error::{CompileError, DecodeError, UnknownChoice};
pub use param::{
    ArrayItem, ArrayItemKind, CompiledTool, ControlSection, FormatRule, Numeric, OutputDataset,
    OutputSpec, ParameterKind, ParameterSpec,
};
pub use payload::{
    ExecutionPayload, Invocation, MaterializationTarget, OutputFormat, OutputRequest, Prefer,
    ResponseType, TransmissionMode,
};
pub use schema_utils::build_path;
