//! HTTP seam of the job client.
//!
//! [`JobClient`](crate::JobClient) only talks to a [`Transport`]; the
//! production implementation wraps a blocking `reqwest` client, tests script
//! responses in memory.

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{describe_status, ClientError};

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

pub trait Transport {
    fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, ClientError>;

    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, ClientError> {
        (**self).post_json(url, headers, body)
    }

    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, ClientError> {
        (**self).get(url, headers)
    }
}

/// Blocking `reqwest` transport with an optional bearer token.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            token: config.token.clone(),
        })
    }

    fn send(
        &self,
        mut request: RequestBuilder,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, ClientError> {
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        debug!(status, bytes = body.len(), "received response");
        Ok(HttpResponse { status, body })
    }
}

impl Transport for ReqwestTransport {
    fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &Value,
    ) -> Result<HttpResponse, ClientError> {
        debug!(%url, "POST");
        let request = self.client.post(url.clone()).body(serde_json::to_vec(body)?);
        self.send(request, headers)
    }

    fn get(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, ClientError> {
        debug!(%url, "GET");
        self.send(self.client.get(url.clone()), headers)
    }
}

/// GET a JSON document, treating any non-2xx status as an error.
pub fn fetch_json(transport: &impl Transport, url: &Url) -> Result<Value, ClientError> {
    let response = transport.get(url, &[("accept", "application/json")])?;
    if !response.is_success() {
        return Err(status_error(url, response.status));
    }
    response.json()
}

pub(crate) fn status_error(url: &Url, status: u16) -> ClientError {
    ClientError::Status {
        status,
        url: url.to_string(),
        message: describe_status(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_json_body() {
        let response = HttpResponse::new(200, r#"{"jobID": "j1"}"#);
        let value: Value = response.json().unwrap();
        assert_eq!(value["jobID"], "j1");
        assert!(HttpResponse::new(200, "not json").json::<Value>().is_err());
    }
}
