//! Queue configuration.
//!
//! Every field is optional on the wire and falls back to its default, so an
//! empty JSON object is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Upper bound for `event_capacity`; the bus allocates its ring up front.
pub const MAX_EVENT_CAPACITY: usize = 1 << 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of items the store holds (pending, active and retrying).
    pub max_size: usize,

    /// Maximum length of a parent/child lineage, counting the new child.
    pub max_chain_size: usize,

    /// Deadline for one dispatch before a timeout failure is synthesized.
    pub processing_timeout_ms: u64,

    /// Retries allowed after the first failed attempt.
    pub retry_attempts: u32,

    /// Delay before the first retry re-enters the queue.
    pub retry_delay_ms: u64,

    /// Growth factor applied to the delay for each further retry. 1.0 keeps it fixed.
    pub retry_backoff_multiplier: f64,

    /// Concurrent dispatch slots. Only a single slot is supported.
    pub max_concurrent: usize,

    /// Statistics window. Informational; counters are cumulative.
    pub stats_window_ms: u64,

    /// Ring size of the event bus.
    pub event_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_chain_size: 10,
            processing_timeout_ms: 30_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            retry_backoff_multiplier: 1.0,
            max_concurrent: 1,
            stats_window_ms: 3_600_000,
            event_capacity: 1024,
        }
    }
}

impl QueueConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading queue config");
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Reject unusable values; clamp `max_concurrent` to the single slot.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Invalid("max_size must be at least 1".into()));
        }
        if self.max_chain_size == 0 {
            return Err(ConfigError::Invalid("max_chain_size must be at least 1".into()));
        }
        if self.processing_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "processing_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.event_capacity == 0 || self.event_capacity > MAX_EVENT_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "event_capacity must be between 1 and {MAX_EVENT_CAPACITY}, got {}",
                self.event_capacity
            )));
        }
        if self.retry_backoff_multiplier.is_nan() || self.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "retry_backoff_multiplier must be >= 1.0, got {}",
                self.retry_backoff_multiplier
            )));
        }
        if self.max_concurrent != 1 {
            warn!(
                requested = self.max_concurrent,
                "only one dispatch slot is supported; clamping max_concurrent to 1"
            );
            self.max_concurrent = 1;
        }
        Ok(self)
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn stats_window(&self) -> Duration {
        Duration::from_millis(self.stats_window_ms)
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_max_chain_size(mut self, max_chain_size: usize) -> Self {
        self.max_chain_size = max_chain_size;
        self
    }

    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_retry_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.retry_backoff_multiplier = multiplier;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = QueueConfig::default();
        assert_eq!(c.max_size, 100);
        assert_eq!(c.max_chain_size, 10);
        assert_eq!(c.processing_timeout(), Duration::from_secs(30));
        assert_eq!(c.retry_attempts, 3);
        assert_eq!(c.retry_delay(), Duration::from_secs(1));
        assert_eq!(c.max_concurrent, 1);
        assert_eq!(c.stats_window(), Duration::from_secs(3600));
    }

    #[test]
    fn empty_object_gives_defaults() {
        let c = QueueConfig::from_json_str("{}").unwrap();
        assert_eq!(c, QueueConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_given_fields() {
        let c = QueueConfig::from_json_str(r#"{ "max_size": 5, "retry_delay_ms": 500 }"#).unwrap();
        assert_eq!(c.max_size, 5);
        assert_eq!(c.retry_delay(), Duration::from_millis(500));
        assert_eq!(c.retry_attempts, 3);
    }

    #[test]
    fn max_concurrent_is_clamped() {
        let c = QueueConfig::from_json_str(r#"{ "max_concurrent": 4 }"#).unwrap();
        assert_eq!(c.max_concurrent, 1);
    }

    #[test]
    fn oversized_event_capacity_is_rejected() {
        let err = QueueConfig::from_json_str(r#"{ "event_capacity": 18446744073709551615 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let at_cap = format!(r#"{{ "event_capacity": {MAX_EVENT_CAPACITY} }}"#);
        assert_eq!(
            QueueConfig::from_json_str(&at_cap).unwrap().event_capacity,
            MAX_EVENT_CAPACITY
        );
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = QueueConfig::from_json_str(r#"{ "max_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = QueueConfig::default().with_max_chain_size(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn shrinking_backoff_is_rejected() {
        let err = QueueConfig::default()
            .with_retry_backoff_multiplier(0.5)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("retry_backoff_multiplier"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = QueueConfig::from_json_str("{ max_size: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = QueueConfig::from_path("/definitely/not/here/shuttle.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
