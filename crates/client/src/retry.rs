//! Exponential-backoff retry policy for status polls.
//!
//! A failed poll is retried with increasing delays up to
//! [`RetryConfig::max_attempts`] before the poll loop gives up.  Setting
//! `max_attempts` to 1 disables retries entirely (every failure is final).

use std::time::Duration;

/// Tunable parameters for the poll retry strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per poll before giving up (must be at least 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}
