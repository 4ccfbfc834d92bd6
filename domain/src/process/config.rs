//! Scheduler tuning parameters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch scheduler configuration.
///
/// `retry_delays[n]` is the wait before retry `n + 1`; its length is the
/// retry budget per task. A zero `timeout` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub max_parallel: usize,
    pub poll_interval: Duration,
    pub retry_delays: Vec<Duration>,
    pub timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            poll_interval: Duration::from_secs(15),
            retry_delays: vec![Duration::from_secs(30), Duration::from_secs(60)],
            timeout: Duration::from_secs(600),
        }
    }
}

impl SchedulerConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.retry_delays.len()
    }

    /// Delay before retry number `attempt` (0-based), if the budget allows one.
    pub fn retry_delay(&self, attempt: usize) -> Option<Duration> {
        self.retry_delays.get(attempt).copied()
    }
}
