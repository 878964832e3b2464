//! Writing a final response to the requested output files.
//!
//! | Response | Transmission | Written                                   |
//! |----------|--------------|-------------------------------------------|
//! | raw      | any          | body bytes; re-encoded for jpeg/png types |
//! | document | reference    | the output's `href` and a newline         |
//! | document | value        | the output's JSON, pretty-printed         |

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use ogcproc_core::{MaterializationTarget, ResponseType, TransmissionMode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::transport::HttpResponse;

/// First line of a raw image target whose bytes could not be decoded.
pub const IMAGE_ERROR_MARKER: &str = "Error: Cannot identify image file";

/// Write `response` to every target and return the paths written.
///
/// Targets whose output is absent from a document response are skipped.
pub fn materialize(
    response: &HttpResponse,
    response_type: ResponseType,
    targets: &[MaterializationTarget],
) -> Result<Vec<PathBuf>, ClientError> {
    let mut written = Vec::with_capacity(targets.len());
    match response_type {
        ResponseType::Raw => {
            for target in targets {
                write_raw(target, &response.body)?;
                written.push(target.file_path.clone());
            }
        }
        ResponseType::Document => {
            let document: Value = response.json()?;
            for target in targets {
                let Some(item) = document.get(&target.output_name) else {
                    warn!(output = %target.output_name, "output missing from results document");
                    continue;
                };
                write_document_item(target, item)?;
                written.push(target.file_path.clone());
            }
        }
    }
    Ok(written)
}

fn write_raw(target: &MaterializationTarget, bytes: &[u8]) -> Result<(), ClientError> {
    let format = match target.format_suffix() {
        Some("png") => Some(ImageFormat::Png),
        Some("jpeg" | "jpg") => Some(ImageFormat::Jpeg),
        _ => None,
    };
    let Some(format) = format else {
        return write_file(&target.file_path, bytes);
    };

    match image::load_from_memory(bytes) {
        Ok(decoded) => {
            debug!(path = %target.file_path.display(), ?format, "re-encoding image output");
            decoded
                .to_rgb8()
                .save_with_format(&target.file_path, format)
                .map_err(|source| ClientError::Image {
                    path: target.file_path.clone(),
                    source,
                })
        }
        Err(e) => {
            warn!(
                path = %target.file_path.display(),
                error = %e,
                "response is not a decodable image, writing raw bytes"
            );
            let mut content = Vec::with_capacity(IMAGE_ERROR_MARKER.len() + 1 + bytes.len());
            content.extend_from_slice(IMAGE_ERROR_MARKER.as_bytes());
            content.push(b'\n');
            content.extend_from_slice(bytes);
            write_file(&target.file_path, &content)
        }
    }
}

fn write_document_item(target: &MaterializationTarget, item: &Value) -> Result<(), ClientError> {
    let href = item.get("href").and_then(Value::as_str);
    let content = match (target.transmission_mode, href) {
        (TransmissionMode::Reference, Some(href)) => format!("{href}\n"),
        (TransmissionMode::Reference, None) => {
            warn!(output = %target.output_name, "reference output has no href, writing the item");
            pretty(item)?
        }
        (TransmissionMode::Value, _) => pretty(item)?,
    };
    write_file(&target.file_path, content.as_bytes())
}

fn pretty(value: &Value) -> Result<String, ClientError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    fs::write(path, bytes).map_err(|source| ClientError::Io {
        path: path.to_path_buf(),
        source,
    })
}
