//! Queue and retry configuration.

use scout_core::Provider;
use std::time::Duration;

/// Retry policy applied when an executor signals transient failure
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(0),
            max_backoff: Duration::from_millis(0),
        }
    }

    /// Set maximum retries
    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set initial backoff duration
    #[must_use]
    pub const fn initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Calculate backoff for a given attempt (0-based), doubling up to the
    /// configured cap
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let backoff = base.saturating_mul(2u64.saturating_pow(attempt));
        let max = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(backoff.min(max))
    }
}

/// Bounds on finished-job bookkeeping kept by a queue.
///
/// Operational policy only: the Job document remains the durable audit
/// trail regardless of what the queue forgets.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Maximum finished entries retained per queue
    pub max_finished: usize,

    /// Maximum age of a retained finished entry
    pub finished_ttl: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_finished: 500,
            finished_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Per-provider queue limits
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum concurrently executing jobs
    pub concurrency: usize,

    /// Maximum admissions per sliding 60-second window
    pub rate_limit_per_minute: u32,

    /// Retry policy for transient executor failures
    pub retry: RetryConfig,

    /// Finished-entry retention bounds
    pub retention: RetentionConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            rate_limit_per_minute: 6,
            retry: RetryConfig::default(),
            retention: RetentionConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Default limits for a provider: resource-heavy intrusive scans run
    /// one at a time, lightweight passive lookups fan out wider.
    #[must_use]
    pub fn for_provider(provider: Provider) -> Self {
        if provider.is_intrusive() {
            Self {
                concurrency: 1,
                rate_limit_per_minute: 6,
                ..Self::default()
            }
        } else {
            Self {
                concurrency: 5,
                rate_limit_per_minute: 30,
                ..Self::default()
            }
        }
    }
}
