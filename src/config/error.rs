//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Event server URL must use ws:// or wss://")]
    InvalidServerUrl,

    #[error("Invalid connect timeout")]
    InvalidConnectTimeout,

    #[error("Invalid keepalive interval")]
    InvalidKeepaliveInterval,

    #[error("Retry base delay must be greater than zero")]
    InvalidBaseDelay,

    #[error("Retry max attempts must be between 1 and {0}")]
    InvalidMaxAttempts(u32),

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
