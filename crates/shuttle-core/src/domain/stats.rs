//! Cumulative processing statistics.

use serde::{Deserialize, Serialize};

use super::{ItemStatus, QueueItem};

/// Rolling counters, updated once per item at terminal settlement.
///
/// `average_processing_time` is in milliseconds and covers the final attempt
/// of each settled item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_retries: u64,
    pub average_processing_time: f64,
}

impl QueueStats {
    /// Fold a settled item (completed, or failed with retries exhausted).
    pub fn record(&mut self, item: &QueueItem) {
        let duration_ms = item
            .processing_time()
            .and_then(|d| d.num_microseconds())
            .map(|us| us as f64 / 1000.0);
        self.record_sample(item.status == ItemStatus::Failed, item.retry_count, duration_ms);
    }

    pub fn record_sample(&mut self, failed: bool, retries: u32, duration_ms: Option<f64>) {
        self.total_processed += 1;
        if failed {
            self.total_failed += 1;
        }
        self.total_retries += u64::from(retries);

        if let Some(d) = duration_ms {
            let n = self.total_processed as f64;
            self.average_processing_time = (self.average_processing_time * (n - 1.0) + d) / n;
        }
    }

    pub fn total_succeeded(&self) -> u64 {
        self.total_processed - self.total_failed
    }
}
