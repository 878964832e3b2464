//! # ogcproc-client
//!
//! Runs a decoded [`ogcproc_core::Invocation`] against an OGC API Processes
//! server: submit, poll the job while it is accepted or running, fetch the
//! results, and write each requested output to its target file.

pub mod config;
pub mod endpoints;
pub mod error;
pub mod job;
pub mod materialize;
pub mod transport;

pub use config::ClientConfig;
pub use endpoints::{Endpoint, Endpoints};
pub use error::{describe_status, ClientError};
pub use job::{ExecutionOutcome, JobClient, JobHandle, JobStatus, Sleeper, ThreadSleeper};
pub use materialize::{materialize, IMAGE_ERROR_MARKER};
pub use transport::{fetch_json, HttpResponse, ReqwestTransport, Transport};
