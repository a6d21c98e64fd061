//! Client configuration loaded from environment variables.
//!
//! All fields have defaults suitable for a locally running composer
//! service; override via environment variables (a `.env` file is honored
//! by the CLI).

use std::time::Duration;

use crate::poller::PollConfig;
use crate::retry::RetryConfig;

/// Connection and polling configuration for the composer client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the composer service (default: `http://localhost:8000`).
    pub api_url: String,
    /// Seconds between status polls (default: `5`).
    pub poll_interval_secs: u64,
    /// Per-request HTTP timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                  |
    /// |--------------------------------|--------------------------|
    /// | `CADENZA_API_URL`              | `http://localhost:8000`  |
    /// | `CADENZA_POLL_INTERVAL_SECS`   | `5`                      |
    /// | `CADENZA_REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("CADENZA_API_URL").unwrap_or_else(|_| "http://localhost:8000".into());

        let poll_interval_secs: u64 = std::env::var("CADENZA_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("CADENZA_POLL_INTERVAL_SECS must be a valid u64");

        let request_timeout_secs: u64 = std::env::var("CADENZA_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("CADENZA_REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            api_url,
            poll_interval_secs,
            request_timeout_secs,
        }
    }

    /// Poll loop parameters derived from this configuration.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            retry: RetryConfig::default(),
        }
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            poll_interval_secs: 5,
            request_timeout_secs: 30,
        }
    }
}
