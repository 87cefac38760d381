//! Reconnection backoff configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::RetryPolicy;

/// Upper bound on `max_attempts`; with the default base delay the last
/// wait is already over nine hours.
pub const MAX_RETRY_ATTEMPTS: u32 = 16;

/// Reconnection backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Delay before the first reconnection attempt, in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Consecutive failed attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl RetryConfig {
    /// Get base delay as Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Build a fresh retry policy from this configuration
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.base_delay(), self.max_attempts)
    }

    /// Validate retry configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_delay_ms == 0 {
            return Err(ValidationError::InvalidBaseDelay);
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ValidationError::InvalidMaxAttempts(MAX_RETRY_ATTEMPTS));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.base_delay(), Duration::from_secs(1));
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn test_policy_uses_configured_values() {
        let config = RetryConfig {
            base_delay_ms: 250,
            max_attempts: 3,
        };
        let mut policy = config.policy();
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_validation_zero_base_delay() {
        let config = RetryConfig {
            base_delay_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBaseDelay));
    }

    #[test]
    fn test_validation_max_attempts_bounds() {
        let zero = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let too_many = RetryConfig {
            max_attempts: MAX_RETRY_ATTEMPTS + 1,
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let at_limit = RetryConfig {
            max_attempts: MAX_RETRY_ATTEMPTS,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }
}
