//! Exercise, chaos and performance settings.

use std::time::Duration;

use application::{ExerciseConfig, PerformanceConfig};
use serde::{Deserialize, Serialize};

/// Rate-limited exercise settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSection {
    /// Length of each exercise in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Length of the warm-up exercise in seconds
    #[serde(default = "default_warm_up_secs")]
    pub warm_up_secs: u64,

    /// Worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Aggregate requests per second
    #[serde(default = "default_rate")]
    pub rate_per_second: f64,
}

const fn default_duration_secs() -> u64 {
    60
}

const fn default_warm_up_secs() -> u64 {
    5
}

const fn default_workers() -> usize {
    10
}

const fn default_rate() -> f64 {
    50.0
}

impl Default for ExerciseSection {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            warm_up_secs: default_warm_up_secs(),
            workers: default_workers(),
            rate_per_second: default_rate(),
        }
    }
}

impl ExerciseSection {
    /// Exercise length
    pub const fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Warm-up length
    pub const fn warm_up(&self) -> Duration {
        Duration::from_secs(self.warm_up_secs)
    }

    /// Workers and rate
    pub const fn exercise_config(&self) -> ExerciseConfig {
        ExerciseConfig {
            workers: self.workers,
            rate_per_second: self.rate_per_second,
        }
    }
}

/// Fault scheduling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosConfig {
    /// How long each fault is held, in seconds
    #[serde(default = "default_hold_secs")]
    pub hold_secs: u64,

    /// Seconds between fault injections
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

const fn default_hold_secs() -> u64 {
    5
}

const fn default_interval_secs() -> u64 {
    10
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            hold_secs: default_hold_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl ChaosConfig {
    /// Hold period
    pub const fn hold(&self) -> Duration {
        Duration::from_secs(self.hold_secs)
    }

    /// Period between injections
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Performance batch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSection {
    /// Requests per blocking batch
    #[serde(default = "default_executions")]
    pub executions: usize,

    /// Threads per blocking batch
    #[serde(default = "default_perf_workers")]
    pub workers: usize,

    /// Requests per non-blocking batch
    #[serde(default = "default_non_blocking_executions")]
    pub non_blocking_executions: usize,
}

const fn default_executions() -> usize {
    10_000
}

const fn default_perf_workers() -> usize {
    40
}

const fn default_non_blocking_executions() -> usize {
    1_000
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            executions: default_executions(),
            workers: default_perf_workers(),
            non_blocking_executions: default_non_blocking_executions(),
        }
    }
}

impl PerformanceSection {
    /// Batch sizes, with the pool size taken from the client settings
    pub const fn performance_config(&self, max_pool_size: usize) -> PerformanceConfig {
        PerformanceConfig {
            executions: self.executions,
            workers: self.workers,
            non_blocking_executions: self.non_blocking_executions,
            max_pool_size,
        }
    }
}
