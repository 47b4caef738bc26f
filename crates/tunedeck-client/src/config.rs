//! Client configuration and defaults.
//!
//! # Design
//! - Defaults mirror the dashboard: five-minute staleness and five-minute
//!   token re-validation.
//! - Retry policy is explicit; token validation never retries.

use std::time::Duration;

use url::Url;

/// Default API base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Window during which cached results are served without refetching.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);
/// Interval between background token validations.
pub const DEFAULT_VALIDATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Retry policy applied by the query cache to transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
    /// Upper bound for a single retry delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Settings for the API client, query cache, and token validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Staleness window for generic resource queries.
    pub stale_time: Duration,
    /// Retry policy for generic resource queries.
    pub retry: RetryPolicy,
    /// Interval between background token validations.
    pub validation_interval: Duration,
}

impl ClientConfig {
    /// Configuration with default timings for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            stale_time: DEFAULT_STALE_TIME,
            retry: RetryPolicy::default(),
            validation_interval: DEFAULT_VALIDATION_INTERVAL,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the staleness window.
    #[must_use]
    pub const fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Override the retry policy for generic queries.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the background validation interval.
    #[must_use]
    pub const fn with_validation_interval(mut self, interval: Duration) -> Self {
        self.validation_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(RetryPolicy::none().delay_for(3), Duration::ZERO);
    }

    #[test]
    fn config_defaults_match_dashboard_timings() -> Result<(), url::ParseError> {
        let config = ClientConfig::new(DEFAULT_API_URL.parse()?);
        assert_eq!(config.stale_time, Duration::from_secs(300));
        assert_eq!(config.validation_interval, Duration::from_secs(300));
        assert_eq!(config.retry.max_retries, 3);

        let tuned = config.with_stale_time(Duration::ZERO).with_retry(RetryPolicy::none());
        assert_eq!(tuned.stale_time, Duration::ZERO);
        assert_eq!(tuned.retry, RetryPolicy::none());
        Ok(())
    }
}
