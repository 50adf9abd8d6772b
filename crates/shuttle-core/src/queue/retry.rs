//! Retry policy: bounded attempts and the delay before each retry.

use std::time::Duration;

use crate::config::QueueConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first failed attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Backoff multiplier; 1.0 keeps every delay at `base_delay`.
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_retries: config.retry_attempts,
            base_delay: config.retry_delay(),
            multiplier: config.retry_backoff_multiplier,
        }
    }

    /// May an item that has already used `retry_count` retries try again?
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }

    /// Delay before retry number `retry` (1-indexed):
    /// `base_delay * multiplier^(retry - 1)`.
    pub fn next_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_follows_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.multiplier, 1.0);
    }

    #[rstest]
    #[case(0, true)]
    #[case(2, true)]
    #[case(3, false)]
    #[case(7, false)]
    fn retries_are_bounded(#[case] used: u32, #[case] allowed: bool) {
        assert_eq!(RetryPolicy::default().should_retry(used), allowed);
    }

    #[test]
    fn fixed_delay_by_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(1), Duration::from_secs(1));
        assert_eq!(policy.next_delay(3), Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_increases() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
        };
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
    }
}
