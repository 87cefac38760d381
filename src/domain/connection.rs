//! Connection lifecycle state and the retry policy driving reconnection.

use std::fmt;
use std::time::Duration;

/// Observable state of a client's single logical connection.
///
/// ```text
/// Disconnected --connect--> Connecting --open--> Connected
///                               ^                    |
///                               |              close / error
///                             timer                  v
///                               +-------- Reconnecting(n)
/// ```
///
/// When the retry budget is exhausted the controller settles in
/// `Disconnected`, which is terminal until `connect` is called again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Waiting to start the given reconnection attempt (1-based).
    Reconnecting(u32),
}

impl ConnectionState {
    /// Returns true while a connection is established.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns the pending reconnection attempt, or 0 outside `Reconnecting`.
    pub fn attempt(&self) -> u32 {
        match self {
            ConnectionState::Reconnecting(attempt) => *attempt,
            _ => 0,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Reconnecting(attempt) => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

/// Exponential backoff with a bounded number of attempts.
///
/// The delay before attempt `n` is `base_delay * 2^(n-1)`. Once more than
/// `max_attempts` consecutive attempts have been requested, [`next_delay`]
/// returns `None` and the caller must stop retrying.
///
/// [`next_delay`]: RetryPolicy::next_delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_attempts: u32,
    current_attempt: u32,
}

impl RetryPolicy {
    /// Creates a policy with no attempts consumed.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            current_attempt: 0,
        }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of reconnection attempts scheduled since the last success.
    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    /// Delay before the given 1-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Advances to the next attempt and returns how long to wait before it.
    ///
    /// Returns `None` when the attempt budget is exhausted. The counter keeps
    /// its exhausted value until [`reset`](RetryPolicy::reset).
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }
        self.current_attempt += 1;
        Some(self.delay_for(self.current_attempt))
    }

    /// Returns true once no further attempt may be scheduled.
    pub fn is_exhausted(&self) -> bool {
        self.current_attempt >= self.max_attempts
    }

    /// Clears the attempt counter after a successful connection.
    pub fn reset(&mut self) {
        self.current_attempt = 0;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_policy_doubles_from_one_second() {
        let mut policy = RetryPolicy::default();
        let delays: Vec<u128> = std::iter::from_fn(|| policy.next_delay())
            .map(|d| d.as_millis())
            .collect();

        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);
    }

    #[test]
    fn sixth_attempt_is_never_scheduled() {
        let mut policy = RetryPolicy::default();
        for _ in 0..5 {
            assert!(policy.next_delay().is_some());
        }

        assert!(policy.is_exhausted());
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.current_attempt(), 5);
    }

    #[test]
    fn reset_restarts_at_first_attempt() {
        let mut policy = RetryPolicy::default();
        policy.next_delay();
        policy.next_delay();
        policy.next_delay();

        policy.reset();

        assert_eq!(policy.current_attempt(), 0);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
        assert_eq!(policy.current_attempt(), 1);
    }

    #[test]
    fn reset_after_exhaustion_allows_new_sequence() {
        let mut policy = RetryPolicy::new(Duration::from_millis(10), 2);
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.next_delay(), None);

        policy.reset();

        assert_eq!(policy.next_delay(), Some(Duration::from_millis(10)));
    }

    #[test]
    fn zero_attempt_policy_never_retries() {
        let mut policy = RetryPolicy::new(Duration::from_millis(10), 0);
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn large_attempts_saturate_instead_of_overflowing() {
        let policy = RetryPolicy::new(Duration::from_secs(u64::MAX / 2), 64);
        assert_eq!(policy.delay_for(64), Duration::MAX);
    }

    #[test]
    fn state_attempt_is_zero_unless_reconnecting() {
        assert_eq!(ConnectionState::Connected.attempt(), 0);
        assert_eq!(ConnectionState::Disconnected.attempt(), 0);
        assert_eq!(ConnectionState::Reconnecting(3).attempt(), 3);
    }

    #[test]
    fn state_display_is_readable() {
        assert_eq!(
            ConnectionState::Reconnecting(2).to_string(),
            "reconnecting (attempt 2)"
        );
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }

    proptest! {
        #[test]
        fn delay_doubles_between_consecutive_attempts(
            base_ms in 1u64..10_000,
            max_attempts in 1u32..16,
        ) {
            let mut policy = RetryPolicy::new(Duration::from_millis(base_ms), max_attempts);
            let mut previous: Option<Duration> = None;
            let mut scheduled = 0;

            while let Some(delay) = policy.next_delay() {
                scheduled += 1;
                match previous {
                    None => prop_assert_eq!(delay, Duration::from_millis(base_ms)),
                    Some(prev) => prop_assert_eq!(delay, prev * 2),
                }
                previous = Some(delay);
            }

            prop_assert_eq!(scheduled, max_attempts);
        }
    }
}
