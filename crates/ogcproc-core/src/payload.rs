//! Execution payload model: the JSON body posted to
//! `processes/<id>/execution`, plus the per-invocation data the job client
//! needs to write outputs back.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UnknownChoice;
use crate::naming::media_suffix;

/// How an output is returned: inline, or as a link to the produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    Value,
    #[default]
    Reference,
}

impl TransmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionMode::Value => "value",
            TransmissionMode::Reference => "reference",
        }
    }
}

impl FromStr for TransmissionMode {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(TransmissionMode::Value),
            "reference" => Ok(TransmissionMode::Reference),
            other => Err(UnknownChoice {
                kind: "transmission mode",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether execution returns a raw byte stream or a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Raw,
    #[default]
    Document,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Raw => "raw",
            ResponseType::Document => "document",
        }
    }
}

impl FromStr for ResponseType {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(ResponseType::Raw),
            "document" => Ok(ResponseType::Document),
            other => Err(UnknownChoice {
                kind: "response type",
                value: other.to_string(),
            }),
        }
    }
}

/// Value of the `Prefer` request header; selects sync or async execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Prefer {
    #[default]
    #[serde(rename = "return=representation")]
    ReturnRepresentation,
    #[serde(rename = "return=minimal")]
    ReturnMinimal,
    #[serde(rename = "respond-async;return=representation")]
    RespondAsync,
}

impl Prefer {
    pub const ALL: [Prefer; 3] = [
        Prefer::ReturnRepresentation,
        Prefer::ReturnMinimal,
        Prefer::RespondAsync,
    ];

    pub fn header_value(&self) -> &'static str {
        match self {
            Prefer::ReturnRepresentation => "return=representation",
            Prefer::ReturnMinimal => "return=minimal",
            Prefer::RespondAsync => "respond-async;return=representation",
        }
    }
}

impl FromStr for Prefer {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prefer::ALL
            .into_iter()
            .find(|p| p.header_value() == s)
            .ok_or_else(|| UnknownChoice {
                kind: "prefer value",
                value: s.to_string(),
            })
    }
}

/// Requested media type of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormat {
    #[serde(rename = "mediaType")]
    pub media_type: String,
}

/// One entry of the payload's `outputs` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRequest {
    #[serde(rename = "transmissionMode")]
    pub transmission_mode: TransmissionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

/// Body of an execution request.
///
/// File-backed inputs are always `{"href": ...}` objects or arrays of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub inputs: Map<String, Value>,
    pub outputs: IndexMap<String, OutputRequest>,
    pub response: ResponseType,
}

/// Where and how one output is written once the job has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationTarget {
    /// Output identifier as the remote API names it.
    pub output_name: String,
    pub file_path: PathBuf,
    pub transmission_mode: TransmissionMode,
    pub media_type: Option<String>,
}

impl MaterializationTarget {
    /// Suffix of the declared media type (`png` for `image/png`), if any.
    pub fn format_suffix(&self) -> Option<&str> {
        self.media_type.as_deref().map(media_suffix)
    }
}

/// Everything needed to run one remote job end-to-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub process_id: String,
    pub prefer: Prefer,
    pub payload: ExecutionPayload,
    pub targets: Vec<MaterializationTarget>,
}
