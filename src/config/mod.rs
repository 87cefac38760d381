//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `LIVESTOCK_SYNC` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use livestock_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Streaming events from {}", config.client.url);
//! ```

mod client;
mod error;
mod retry;
mod telemetry;

pub use client::ClientConfig;
pub use error::{ConfigError, ValidationError};
pub use retry::{RetryConfig, MAX_RETRY_ATTEMPTS};
pub use telemetry::TelemetryConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a client
/// pointed at `ws://localhost:5000`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Event server connection (URL, timeouts, backoff)
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `LIVESTOCK_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `LIVESTOCK_SYNC__CLIENT__URL=wss://...` -> `client.url = ...`
    /// - `LIVESTOCK_SYNC__CLIENT__RETRY__MAX_ATTEMPTS=8` -> `client.retry.max_attempts = 8`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("LIVESTOCK_SYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.client.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
