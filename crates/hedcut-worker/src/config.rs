//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent render tasks
    pub max_concurrent_tasks: usize,
    /// Task starts allowed per rate window
    pub max_starts_per_window: u32,
    /// Rate window length
    pub starts_window: Duration,
    /// How often to promote due delayed tasks
    pub promote_interval: Duration,
    /// How often to scan for orphaned pending tasks
    pub claim_interval: Duration,
    /// How often to expire old completed/failed records
    pub clean_interval: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 5,
            max_starts_per_window: 10,
            starts_window: Duration::from_secs(60),
            promote_interval: Duration::from_secs(5),
            claim_interval: Duration::from_secs(30),
            clean_interval: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_tasks: std::env::var("WORKER_MAX_TASKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_starts_per_window: std::env::var("WORKER_MAX_STARTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            starts_window: Duration::from_secs(
                std::env::var("WORKER_STARTS_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            promote_interval: Duration::from_secs(
                std::env::var("WORKER_PROMOTE_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            clean_interval: Duration::from_secs(
                std::env::var("WORKER_CLEAN_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_dispatch_budget() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.max_starts_per_window, 10);
        assert_eq!(config.starts_window, Duration::from_secs(60));
    }
}
