//! Application services - load harness and fault scheduling

mod chaos_scheduler;
mod chaos_suite;
mod completion_tracker;
mod exercise;
mod fault_control;
mod performance_suite;
mod rate_limiter;
mod scenario_metrics;
mod shutdown;
mod task_runner;
mod workload;

pub use chaos_scheduler::{ChaosScheduler, ChaosStats, DEFAULT_HOLD, DEFAULT_INTERVAL};
pub use chaos_suite::{ChaosExercise, ChaosSuite, ChaosSuiteConfig};
pub use completion_tracker::{CompletionGuard, CompletionTracker};
pub use exercise::{ExerciseConfig, ExerciseController, ExerciseSummary};
pub use fault_control::{CONTROL_PATH, FaultControlPlane};
pub use scenario_metrics::{
    ERRORS_METRIC, LATENCY_METRIC, LatencyTimer, MetricsRegistry, RESPONSES_METRIC,
    ScenarioMetrics, ScenarioSnapshot, TimerSnapshot, classify,
};
pub use performance_suite::{PerformanceConfig, PerformanceMode, PerformanceRun, PerformanceSuite};
pub use rate_limiter::RateLimiter;
pub use shutdown::ShutdownSignal;
pub use task_runner::{DEFAULT_STOP_TIMEOUT, RateLimitedTaskRunner, RunnerStats, Task};
pub use workload::Workload;
