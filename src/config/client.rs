//! Event server connection configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::retry::RetryConfig;

/// Connection settings for a sync client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// WebSocket endpoint of the event server
    #[serde(default = "default_url")]
    pub url: String,

    /// Time allowed for a single connection attempt, in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Interval between keepalive probes, in seconds
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,

    /// Reconnection backoff
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get keepalive interval as Duration
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// Returns a copy pointing at a different endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Validate client configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("CLIENT__URL"));
        }
        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(ValidationError::InvalidServerUrl);
        }
        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(ValidationError::InvalidConnectTimeout);
        }
        if self.keepalive_interval_secs == 0 {
            return Err(ValidationError::InvalidKeepaliveInterval);
        }
        self.retry.validate()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_secs: default_connect_timeout(),
            keepalive_interval_secs: default_keepalive_interval(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_url() -> String {
    "ws://localhost:5000".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_keepalive_interval() -> u64 {
    30
}
