use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://ospd.geolabs.fr:8300/ogc-api/";

/// Connection settings for a processes server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Root of the API; `processes/` and `jobs/` are resolved against it.
    pub base_url: String,
    /// Seconds between two job status polls.
    pub poll_interval: u64,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    /// Bearer token sent with every request when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: 20,
            request_timeout: 120,
            token: None,
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.poll_interval(), Duration::from_secs(20));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_kebab_case_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base-url": "http://localhost:8080/ogc-api/", "poll-interval": 1}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/ogc-api/");
        assert_eq!(config.poll_interval, 1);
        assert_eq!(config.request_timeout, 120);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = ClientConfig {
            token: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"request-timeout\""));
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
