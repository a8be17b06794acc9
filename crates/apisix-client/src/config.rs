//! Admin API client configuration

use apisix_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default Admin API endpoint of a local APISIX
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9180/apisix/admin";

/// Connection settings for the Admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Admin API base URL, including the `/apisix/admin` prefix
    pub endpoint: String,

    /// Value of the `X-API-KEY` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout of a single request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Attempts made for idempotent requests, including the first one
    pub retry_attempts: u32,

    /// Delay before the first retry, multiplied by the attempt number
    #[serde(with = "humantime_serde")]
    pub retry_backoff: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    /// Configuration for `endpoint` with default settings
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retries(mut self, attempts: u32, backoff: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_backoff = backoff;
        self
    }

    /// Parsed endpoint without a trailing slash
    pub fn base_url(&self) -> Result<Url> {
        let trimmed = self.endpoint.trim_end_matches('/');
        let url = Url::parse(trimmed)
            .map_err(|e| Error::Config(format!("invalid endpoint '{}': {e}", self.endpoint)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::Config(format!(
                "unsupported endpoint scheme '{other}', expected http or https"
            ))),
        }
    }

    /// Check the configuration before building a client
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.retry_attempts == 0 {
            return Err(Error::Config("retry_attempts must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}
