//! JobClient tests over a scripted in-memory transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use ogcproc_client::{
    ClientError, Endpoints, ExecutionOutcome, HttpResponse, JobClient, JobStatus, Sleeper,
    Transport,
};
use ogcproc_core::{ExecutionPayload, Invocation, Prefer, ResponseType};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use url::Url;

// ── Helpers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Call {
    method: &'static str,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

#[derive(Default)]
struct ScriptedTransport {
    responses: RefCell<VecDeque<HttpResponse>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn record(
        &self,
        method: &'static str,
        url: &Url,
        headers: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, ClientError> {
        self.calls.borrow_mut().push(Call {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.cloned(),
        });
        Ok(self
            .responses
            .borrow_mut()
            .pop_front()
            .expect("transport script exhausted"))
    }

    fn urls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.url.clone()).collect()
    }
}

impl Transport for ScriptedTransport {
    fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, ClientError> {
        self.record("POST", url, headers, Some(body))
    }

    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, ClientError> {
        self.record("GET", url, headers, None)
    }
}

#[derive(Default)]
struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

const BASE: &str = "https://ospd.geolabs.fr:8300/ogc-api/";

fn invocation(prefer: Prefer) -> Invocation {
    let mut inputs = Map::new();
    inputs.insert("S".to_string(), json!("World"));
    Invocation {
        process_id: "hellor".to_string(),
        prefer,
        payload: ExecutionPayload {
            inputs,
            outputs: Default::default(),
            response: ResponseType::Document,
        },
        targets: Vec::new(),
    }
}

fn client<'a>(
    transport: &'a ScriptedTransport,
    sleeper: &'a RecordingSleeper,
) -> JobClient<&'a ScriptedTransport, &'a RecordingSleeper> {
    JobClient::new(
        transport,
        sleeper,
        Endpoints::new(BASE).unwrap(),
        Duration::from_secs(20),
    )
}

fn status(job_id: &str, status: &str) -> HttpResponse {
    HttpResponse::new(200, json!({"jobID": job_id, "status": status}).to_string())
}

// ── Submission ──────────────────────────────────────────────────────────────

#[test]
fn test_submit_headers_and_body() {
    let transport = ScriptedTransport::new(vec![HttpResponse::new(200, "{}")]);
    let sleeper = RecordingSleeper::default();
    client(&transport, &sleeper)
        .execute(&invocation(Prefer::ReturnRepresentation))
        .unwrap();

    let calls = transport.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "POST");
    assert_eq!(
        calls[0].url,
        "https://ospd.geolabs.fr:8300/ogc-api/processes/hellor/execution"
    );
    assert_eq!(
        calls[0].headers,
        vec![
            ("accept".to_string(), "*/*".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Prefer".to_string(), "return=representation".to_string()),
        ]
    );
    assert_eq!(
        calls[0].body,
        Some(json!({"inputs": {"S": "World"}, "outputs": {}, "response": "document"}))
    );
}

#[test]
fn test_synchronous_success_skips_polling() {
    let transport = ScriptedTransport::new(vec![HttpResponse::new(
        200,
        r#"{"Result": {"value": "Hello World"}}"#,
    )]);
    let sleeper = RecordingSleeper::default();
    let outcome = client(&transport, &sleeper)
        .execute(&invocation(Prefer::ReturnRepresentation))
        .unwrap();

    match outcome {
        ExecutionOutcome::Completed { response, job } => {
            assert_eq!(response.status, 200);
            assert!(job.is_none());
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(sleeper.sleeps.borrow().is_empty());
}

#[test]
fn test_rejected_submission_is_described() {
    let table = [
        (400, "Bad request"),
        (404, "Not found"),
        (405, "Method not allowed"),
        (500, "Internal server error"),
    ];
    for (code, prefix) in table {
        let transport = ScriptedTransport::new(vec![HttpResponse::new(code, "")]);
        let sleeper = RecordingSleeper::default();
        let outcome = client(&transport, &sleeper)
            .execute(&invocation(Prefer::ReturnRepresentation))
            .unwrap();
        match outcome {
            ExecutionOutcome::Rejected { status, message } => {
                assert_eq!(status, code);
                assert!(message.starts_with(prefix), "{code}: {message}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    let transport = ScriptedTransport::new(vec![HttpResponse::new(503, "")]);
    let sleeper = RecordingSleeper::default();
    let outcome = client(&transport, &sleeper)
        .execute(&invocation(Prefer::ReturnRepresentation))
        .unwrap();
    assert_eq!(
        outcome,
        ExecutionOutcome::Rejected {
            status: 503,
            message: "Unexpected HTTP status 503".to_string()
        }
    );
}

// ── Polling ─────────────────────────────────────────────────────────────────

#[test]
fn test_async_job_polls_until_successful() {
    let results = HttpResponse::new(200, r#"{"Result": {"href": "https://x/out.txt"}}"#);
    let transport = ScriptedTransport::new(vec![
        HttpResponse::new(201, json!({"jobID": "j-42", "status": "accepted"}).to_string()),
        status("j-42", "running"),
        status("j-42", "running"),
        status("j-42", "successful"),
        results.clone(),
    ]);
    let sleeper = RecordingSleeper::default();
    let outcome = client(&transport, &sleeper)
        .execute(&invocation(Prefer::RespondAsync))
        .unwrap();

    assert_eq!(
        sleeper.sleeps.borrow().as_slice(),
        &[Duration::from_secs(20), Duration::from_secs(20)]
    );
    assert_eq!(
        transport.urls(),
        vec![
            format!("{BASE}processes/hellor/execution"),
            format!("{BASE}jobs/j-42"),
            format!("{BASE}jobs/j-42"),
            format!("{BASE}jobs/j-42"),
            format!("{BASE}jobs/j-42/results"),
        ]
    );
    let calls = transport.calls.borrow();
    assert_eq!(calls[0].headers[2].1, "respond-async;return=representation");
    assert!(calls[1..]
        .iter()
        .all(|c| c.headers == vec![("accept".to_string(), "application/json".to_string())]));

    match outcome {
        ExecutionOutcome::Completed { response, job } => {
            assert_eq!(response, results);
            let job = job.expect("job handle");
            assert_eq!(job.job_id, "j-42");
            assert_eq!(job.status, JobStatus::Successful);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn test_failed_job_still_fetches_results() {
    let transport = ScriptedTransport::new(vec![
        HttpResponse::new(201, json!({"jobID": "j-7", "status": "running"}).to_string()),
        status("j-7", "failed"),
        HttpResponse::new(200, "{}"),
    ]);
    let sleeper = RecordingSleeper::default();
    let outcome = client(&transport, &sleeper)
        .execute(&invocation(Prefer::RespondAsync))
        .unwrap();

    assert!(sleeper.sleeps.borrow().is_empty());
    assert_eq!(
        transport.urls().last().cloned(),
        Some(format!("{BASE}jobs/j-7/results"))
    );
    match outcome {
        ExecutionOutcome::Completed { job: Some(job), .. } => {
            assert_eq!(job.status, JobStatus::Failed)
        }
        other => panic!("expected completion with job, got {other:?}"),
    }
}

#[test]
fn test_already_finished_job_is_not_polled() {
    let transport = ScriptedTransport::new(vec![
        HttpResponse::new(201, json!({"jobID": "j-1", "status": "successful"}).to_string()),
        HttpResponse::new(200, "{}"),
    ]);
    let sleeper = RecordingSleeper::default();
    client(&transport, &sleeper)
        .execute(&invocation(Prefer::RespondAsync))
        .unwrap();
    assert_eq!(transport.urls().len(), 2);
}

#[test]
fn test_poll_error_status_is_an_error() {
    let transport = ScriptedTransport::new(vec![
        HttpResponse::new(201, json!({"jobID": "gone", "status": "running"}).to_string()),
        HttpResponse::new(404, ""),
    ]);
    let sleeper = RecordingSleeper::default();
    let err = client(&transport, &sleeper)
        .execute(&invocation(Prefer::RespondAsync))
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
}

#[test]
fn test_created_without_job_id_is_malformed() {
    let transport = ScriptedTransport::new(vec![HttpResponse::new(201, "{}")]);
    let sleeper = RecordingSleeper::default();
    let err = client(&transport, &sleeper)
        .execute(&invocation(Prefer::RespondAsync))
        .unwrap_err();
    assert!(matches!(err, ClientError::MalformedJob(_)));
}
