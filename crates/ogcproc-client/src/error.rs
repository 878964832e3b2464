//! Error types for the job client and the output materializer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Base URL '{0}' cannot take path segments")]
    InvalidBaseUrl(String),

    #[error("{url} returned HTTP {status}: {message}")]
    Status {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Malformed job status document: {0}")]
    MalformedJob(String),

    #[error("JSON (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Human-readable meaning of an HTTP status returned by a processes server.
pub fn describe_status(status: u16) -> String {
    match status {
        400 => "Bad request: the server could not process the execution request".to_string(),
        404 => "Not found: the process or job does not exist".to_string(),
        405 => "Method not allowed on this endpoint".to_string(),
        500 => "Internal server error".to_string(),
        other => format!("Unexpected HTTP status {other}"),
    }
}
