//! Configuration for the client and its retry policy.

use crate::transport::TransportError;
use std::time::Duration;

/// Configuration for a client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Long-poll timeout requested from the server on each sync call.
    ///
    /// The server holds the request open for up to this long when no new
    /// data is available; the client adds no delay of its own between
    /// successful iterations.
    pub long_poll_timeout: Duration,
    /// Retry configuration for the sync loop.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            long_poll_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the long-poll timeout.
    #[must_use]
    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long_poll_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the sync loop should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then retry the same call with the same cursor.
    RetryAfter(Duration),
    /// Stop retrying and surface the failure.
    GiveUp,
}

/// Configuration for retry behavior.
///
/// The decision for a failed attempt is a pure function of the attempt
/// number and the failure kind; see [`RetryConfig::decide`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration with the given retry budget.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter, making delays exact.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Decides what to do after attempt `attempt` (0-based) failed with
    /// `error`.
    ///
    /// Retryable failures get [`RetryDecision::RetryAfter`] until the retry
    /// budget is exhausted; everything else gives up immediately. With the
    /// default budget of 3 a call may be attempted at most four times.
    pub fn decide(&self, attempt: u32, error: &TransportError) -> RetryDecision {
        if !error.is_retryable() || attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for_retry(attempt + 1))
    }

    /// Calculates the delay before the `n`-th retry (1-based).
    pub fn delay_for_retry(&self, n: u32) -> Duration {
        if n == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(n.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter, derived from the clock so no RNG dependency
            // is needed.
            Duration::from_secs_f64(capped + capped * 0.25 * clock_jitter())
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Pseudo-random value in `[0, 1)` from the subsecond clock.
fn clock_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_error() -> TransportError {
        TransportError::Network("connection reset".into())
    }

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new()
            .with_long_poll_timeout(Duration::from_secs(10))
            .with_retry(RetryConfig::no_retry());

        assert_eq!(config.long_poll_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 0);
    }

    #[test]
    fn decide_retries_transient_failures_within_budget() {
        let config = RetryConfig::new(3).without_jitter();

        assert!(matches!(
            config.decide(0, &network_error()),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            config.decide(2, &network_error()),
            RetryDecision::RetryAfter(_)
        ));
        // Attempt 3 was the last permitted one.
        assert_eq!(config.decide(3, &network_error()), RetryDecision::GiveUp);
    }

    #[test]
    fn decide_gives_up_on_fatal_failures() {
        let config = RetryConfig::new(3);
        let fatal = TransportError::Server {
            status: 401,
            message: "unknown token".into(),
        };
        assert_eq!(config.decide(0, &fatal), RetryDecision::GiveUp);
    }

    #[test]
    fn no_retry_gives_up_immediately() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.decide(0, &network_error()), RetryDecision::GiveUp);
    }

    #[test]
    fn delays_grow_exponentially() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .without_jitter();

        assert_eq!(config.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(400));
    }

    #[test]
    fn delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0)
            .without_jitter();

        assert_eq!(config.delay_for_retry(6), Duration::from_secs(5));
    }

    #[test]
    fn jittered_delay_stays_within_bounds() {
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(100));

        let delay = config.delay_for_retry(1);
        assert!(delay >= Duration::from_millis(100));
        assert!(delay <= Duration::from_millis(125));
    }
}
