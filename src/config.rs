//! Pipeline configuration
//!
//! Tunables for the queue worker and batch engine. Defaults follow the
//! back-office deployment: 1s idle poll, at most 6 concurrent batches to
//! bound storage-connection pressure, and batch sizes of 10 (20 for
//! requests above 1000 seeds, where larger batches amortize
//! per-transaction overhead).

use std::time::Duration;

/// Idle-queue polling interval.
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Maximum batches in flight per request.
pub const MAX_CONCURRENT_BATCHES: usize = 6;

/// Batch size for ordinary requests.
pub const BATCH_SIZE: usize = 10;

/// Batch size for requests above [`LARGE_REQUEST_THRESHOLD`] seeds.
pub const LARGE_BATCH_SIZE: usize = 20;

/// Seed count above which [`LARGE_BATCH_SIZE`] applies.
pub const LARGE_REQUEST_THRESHOLD: usize = 1000;

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub poll_interval: Duration,
    pub max_concurrent_batches: usize,
    pub batch_size: usize,
    pub large_batch_size: usize,
    pub large_request_threshold: usize,
    /// Key handed to the balance encryptor; sourced from platform secrets.
    pub encryption_key: String,
}

impl MigrationConfig {
    pub fn new(encryption_key: impl Into<String>) -> Self {
        Self {
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            max_concurrent_batches: MAX_CONCURRENT_BATCHES,
            batch_size: BATCH_SIZE,
            large_batch_size: LARGE_BATCH_SIZE,
            large_request_threshold: LARGE_REQUEST_THRESHOLD,
            encryption_key: encryption_key.into(),
        }
    }

    /// Throughput policy: batch size for a request with `seed_count` seeds.
    pub fn batch_size_for(&self, seed_count: usize) -> usize {
        if seed_count > self.large_request_threshold {
            self.large_batch_size
        } else {
            self.batch_size
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_policy() {
        let config = MigrationConfig::new("k");
        assert_eq!(config.batch_size_for(1), 10);
        assert_eq!(config.batch_size_for(1000), 10);
        assert_eq!(config.batch_size_for(1001), 20);
        assert_eq!(config.batch_size_for(50_000), 20);
    }

    #[test]
    fn test_defaults() {
        let config = MigrationConfig::new("k");
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.max_concurrent_batches, 6);
    }
}
