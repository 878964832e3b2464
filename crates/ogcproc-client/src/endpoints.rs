//! URLs of the processes API, resolved against a base URL.

use url::Url;

use crate::error::ClientError;

/// The API resources the client addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `processes/<id>`: the process description.
    Process { process_id: &'a str },
    /// `processes/<id>/execution`: job submission.
    Execute { process_id: &'a str },
    /// `jobs/<id>`: job status.
    Job { job_id: &'a str },
    /// `jobs/<id>/results`: job results.
    Results { job_id: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, endpoint: Endpoint<'_>) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClientError::InvalidBaseUrl(self.base.to_string()))?;
            segments.pop_if_empty();
            match endpoint {
                Endpoint::Process { process_id } => {
                    segments.extend(["processes", process_id]);
                }
                Endpoint::Execute { process_id } => {
                    segments.extend(["processes", process_id, "execution"]);
                }
                Endpoint::Job { job_id } => {
                    segments.extend(["jobs", job_id]);
                }
                Endpoint::Results { job_id } => {
                    segments.extend(["jobs", job_id, "results"]);
                }
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_with_trailing_slash_base() {
        let endpoints = Endpoints::new("https://ospd.geolabs.fr:8300/ogc-api/").unwrap();
        assert_eq!(
            endpoints
                .url(Endpoint::Execute { process_id: "OTB.BandMath" })
                .unwrap()
                .as_str(),
            "https://ospd.geolabs.fr:8300/ogc-api/processes/OTB.BandMath/execution"
        );
        assert_eq!(
            endpoints.url(Endpoint::Job { job_id: "abc" }).unwrap().as_str(),
            "https://ospd.geolabs.fr:8300/ogc-api/jobs/abc"
        );
        assert_eq!(
            endpoints.url(Endpoint::Results { job_id: "abc" }).unwrap().as_str(),
            "https://ospd.geolabs.fr:8300/ogc-api/jobs/abc/results"
        );
    }

    #[test]
    fn test_urls_without_trailing_slash_base() {
        let endpoints = Endpoints::new("http://localhost:8080/ogc-api").unwrap();
        assert_eq!(
            endpoints
                .url(Endpoint::Process { process_id: "hellor" })
                .unwrap()
                .as_str(),
            "http://localhost:8080/ogc-api/processes/hellor"
        );
    }

    #[test]
    fn test_segments_are_escaped() {
        let endpoints = Endpoints::new("http://localhost/").unwrap();
        let url = endpoints.url(Endpoint::Job { job_id: "a/b" }).unwrap();
        assert_eq!(url.as_str(), "http://localhost/jobs/a%2Fb");
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            Endpoints::new("mailto:someone@example.org"),
            Err(ClientError::InvalidBaseUrl(_))
        ));
        assert!(matches!(Endpoints::new("not a url"), Err(ClientError::Url(_))));
    }
}
