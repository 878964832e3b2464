//! Job submission and polling.
//!
//! One execution moves through a small state machine:
//!
//! ```text
//! Submitted ──201──▶ Pending ──poll until not accepted/running──▶ Terminal ──▶ results
//!     │
//!     ├── other 2xx ──▶ completed synchronously
//!     └── non-2xx ────▶ rejected
//! ```

use std::thread;
use std::time::Duration;

use ogcproc_core::Invocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::{describe_status, ClientError};
use crate::transport::{status_error, HttpResponse, ReqwestTransport, Transport};

/// Remote job status as reported by `jobs/<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether polling should continue.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Accepted | JobStatus::Running)
    }
}

/// Identity and last known status of a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub status: JobStatus,
}

impl JobHandle {
    fn from_response(response: &HttpResponse) -> Result<Self, ClientError> {
        serde_json::from_slice(&response.body).map_err(|e| {
            ClientError::MalformedJob(format!(
                "{e}: {}",
                String::from_utf8_lossy(&response.body)
            ))
        })
    }
}

/// How an execution ended, from the client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The server produced a final response: the synchronous execution
    /// response, or the results of an asynchronous job (`job` is set).
    Completed {
        response: HttpResponse,
        job: Option<JobHandle>,
    },
    /// Submission was refused with a non-2xx status.
    Rejected { status: u16, message: String },
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

enum JobState {
    Submitted(HttpResponse),
    Pending(JobHandle),
    Terminal(JobHandle),
}

/// Client for `processes/<id>/execution` and the `jobs` resources.
pub struct JobClient<T, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    endpoints: Endpoints,
    poll_interval: Duration,
}

impl JobClient<ReqwestTransport, ThreadSleeper> {
    /// A client talking HTTP to the server described by `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self::new(
            ReqwestTransport::new(config)?,
            ThreadSleeper,
            Endpoints::new(&config.base_url)?,
            config.poll_interval(),
        ))
    }
}

impl<T: Transport, S: Sleeper> JobClient<T, S> {
    pub fn new(transport: T, sleeper: S, endpoints: Endpoints, poll_interval: Duration) -> Self {
        Self {
            transport,
            sleeper,
            endpoints,
            poll_interval,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit `invocation` and drive it to a final response.
    ///
    /// A failed job is logged, and its results are still fetched so whatever
    /// the server returns can be written out.
    pub fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutcome, ClientError> {
        let mut state = JobState::Submitted(self.submit(invocation)?);
        loop {
            state = match state {
                JobState::Submitted(response) if response.status == 201 => {
                    let handle = JobHandle::from_response(&response)?;
                    info!(job_id = %handle.job_id, status = ?handle.status, "job accepted");
                    JobState::Pending(handle)
                }
                JobState::Submitted(response) if response.is_success() => {
                    debug!(status = response.status, "synchronous execution completed");
                    return Ok(ExecutionOutcome::Completed {
                        response,
                        job: None,
                    });
                }
                JobState::Submitted(response) => {
                    let message = describe_status(response.status);
                    error!(status = response.status, "{message}");
                    return Ok(ExecutionOutcome::Rejected {
                        status: response.status,
                        message,
                    });
                }
                JobState::Pending(handle) if handle.status.is_pending() => {
                    JobState::Terminal(self.wait_for_completion(&handle.job_id)?)
                }
                JobState::Pending(handle) => JobState::Terminal(handle),
                JobState::Terminal(handle) => {
                    if handle.status == JobStatus::Failed {
                        let job_url = self.endpoints.url(Endpoint::Job {
                            job_id: &handle.job_id,
                        })?;
                        error!(
                            job_id = %handle.job_id,
                            "job failed, check the job status at {job_url}"
                        );
                    }
                    let response = self.fetch_results(&handle.job_id)?;
                    return Ok(ExecutionOutcome::Completed {
                        response,
                        job: Some(handle),
                    });
                }
            };
        }
    }

    /// POST the payload to `processes/<id>/execution`.
    pub fn submit(&self, invocation: &Invocation) -> Result<HttpResponse, ClientError> {
        let url = self.endpoints.url(Endpoint::Execute {
            process_id: &invocation.process_id,
        })?;
        let body = serde_json::to_value(&invocation.payload)?;
        let headers = [
            ("accept", "*/*"),
            ("Content-Type", "application/json"),
            ("Prefer", invocation.prefer.header_value()),
        ];
        info!(%url, prefer = invocation.prefer.header_value(), "submitting execution request");
        self.transport.post_json(&url, &headers, &body)
    }

    /// Read the current status of a job.
    pub fn poll(&self, job_id: &str) -> Result<JobHandle, ClientError> {
        let url = self.endpoints.url(Endpoint::Job { job_id })?;
        let response = self.transport.get(&url, &[("accept", "application/json")])?;
        if !response.is_success() {
            return Err(status_error(&url, response.status));
        }
        JobHandle::from_response(&response)
    }

    /// Poll until the job leaves `accepted`/`running`, sleeping only between
    /// polls.
    pub fn wait_for_completion(&self, job_id: &str) -> Result<JobHandle, ClientError> {
        let mut polls = 0usize;
        loop {
            let handle = self.poll(job_id)?;
            polls += 1;
            debug!(job_id, status = ?handle.status, polls, "polled job");
            if !handle.status.is_pending() {
                return Ok(handle);
            }
            self.sleeper.sleep(self.poll_interval);
        }
    }

    /// GET `jobs/<id>/results`. The response is returned whatever its status.
    pub fn fetch_results(&self, job_id: &str) -> Result<HttpResponse, ClientError> {
        let url = self.endpoints.url(Endpoint::Results { job_id })?;
        debug!(%url, "fetching job results");
        self.transport.get(&url, &[("accept", "application/json")])
    }
}
