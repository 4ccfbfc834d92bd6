//! Scheduler configuration from TOML (`[scheduler]` section)

use kanon_domain::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw scheduler configuration from TOML
///
/// # Example
///
/// ```toml
/// [scheduler]
/// max_parallel = 3
/// poll_interval_ms = 15000
/// retry_delays_ms = [30000, 60000]
/// timeout_ms = 600000          # 0 = unbounded
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSchedulerConfig {
    pub max_parallel: usize,
    pub poll_interval_ms: u64,
    pub retry_delays_ms: Vec<u64>,
    pub timeout_ms: u64,
}

impl Default for FileSchedulerConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for FileSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            max_parallel: config.max_parallel,
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            retry_delays_ms: config
                .retry_delays
                .iter()
                .map(|d| d.as_millis() as u64)
                .collect(),
            timeout_ms: config.timeout.as_millis() as u64,
        }
    }
}

impl FileSchedulerConfig {
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::default()
            .with_max_parallel(self.max_parallel)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_retry_delays(
                self.retry_delays_ms
                    .iter()
                    .copied()
                    .map(Duration::from_millis)
                    .collect(),
            )
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_domain() {
        let file = FileSchedulerConfig::default();
        assert_eq!(file.max_parallel, 3);
        assert_eq!(file.poll_interval_ms, 15_000);
        assert_eq!(file.retry_delays_ms, vec![30_000, 60_000]);
        assert_eq!(file.timeout_ms, 600_000);
        assert_eq!(file.to_scheduler_config(), SchedulerConfig::default());
    }
}
