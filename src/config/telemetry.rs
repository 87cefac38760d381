//! Logging configuration

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::error::ValidationError;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Rust log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

impl TelemetryConfig {
    /// Build the log filter, letting `RUST_LOG` take precedence
    pub fn env_filter(&self) -> Result<EnvFilter, ValidationError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.log_level)
                .map_err(|e| ValidationError::InvalidLogFilter(e.to_string())),
        }
    }

    /// Validate telemetry configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        EnvFilter::try_new(&self.log_level)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidLogFilter(e.to_string()))
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info,livestock_sync=debug".to_string()
}
