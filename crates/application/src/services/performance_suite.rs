//! Performance suite
//!
//! Fixed-count request batches through the engine under test, in three
//! modes: blocking calls, async calls awaited by the caller, and async calls
//! fired without waiting and drained at the end.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use domain::{DomainError, Scenario, ScenarioId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CompletionTracker, Workload};
use crate::error::ApplicationError;

/// How requests are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    /// Blocking wrappers on worker threads
    BlockingSync,
    /// Async dispatch, each worker waits for its own request
    BlockingAsync,
    /// Async dispatch of a whole batch, drained once
    NonBlockingAsync,
}

impl PerformanceMode {
    /// Every mode in run order
    pub const ALL: [Self; 3] = [Self::BlockingSync, Self::BlockingAsync, Self::NonBlockingAsync];

    /// Name used in metric keys and on the command line
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BlockingSync => "blocking_sync",
            Self::BlockingAsync => "blocking_async",
            Self::NonBlockingAsync => "non_blocking_async",
        }
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s.replace('-', "_"))
            .ok_or_else(|| DomainError::UnknownScenario(s.to_string()))
    }
}

/// Batch sizes of the performance suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Requests per blocking batch
    pub executions: usize,
    /// Threads sharing a blocking batch
    pub workers: usize,
    /// Requests per non-blocking batch
    pub non_blocking_executions: usize,
    /// Connection pool size; also the warm-up count and the second
    /// non-blocking batch size
    pub max_pool_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            executions: 10_000,
            workers: 40,
            non_blocking_executions: 1_000,
            max_pool_size: 200,
        }
    }
}

/// Result of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceRun {
    /// Metric key the batch recorded under
    pub id: ScenarioId,
    /// Requests issued
    pub executions: usize,
    /// Wall-clock time of the batch
    pub elapsed: Duration,
}

impl PerformanceRun {
    /// Requests per second
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.executions as f64 / secs } else { 0.0 }
    }
}

/// Performance batches against one engine
#[derive(Debug)]
pub struct PerformanceSuite {
    workload: Workload,
    config: PerformanceConfig,
    class: String,
}

impl PerformanceSuite {
    /// Create a suite
    pub fn new(workload: Workload, config: PerformanceConfig) -> Self {
        let class = format!("perf.{}", workload.engine().name());
        Self {
            workload,
            config,
            class,
        }
    }

    /// Metric key of `mode` and `scenario`
    pub fn scenario_id(&self, mode: PerformanceMode, scenario: Scenario) -> ScenarioId {
        ScenarioId::new(self.class.clone(), format!("{mode}_{scenario}"))
    }

    /// Fill the connection pool with sequential short GETs
    pub fn warm_up_pool(&self) -> PerformanceRun {
        let id = ScenarioId::new(self.class.clone(), "warm_up_pool");
        let workload = self.workload.with_scenario(Scenario::ShortGet);
        let started = Instant::now();
        for _ in 0..self.config.max_pool_size {
            workload.execute_blocking(&id);
        }
        self.finish(id, self.config.max_pool_size, started)
    }

    /// Blocking calls spread over the worker threads
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn blocking_sync(&self, scenario: Scenario) -> Result<PerformanceRun, ApplicationError> {
        let id = self.scenario_id(PerformanceMode::BlockingSync, scenario);
        let workload = self.workload.with_scenario(scenario);
        self.fan_out(id, move |id| {
            workload.execute_blocking(id);
        })
    }

    /// Async calls spread over the worker threads, each awaited in turn
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn blocking_async(&self, scenario: Scenario) -> Result<PerformanceRun, ApplicationError> {
        let id = self.scenario_id(PerformanceMode::BlockingAsync, scenario);
        let workload = self.workload.with_scenario(scenario);
        self.fan_out(id, move |id| {
            workload.dispatch_and_wait(id.clone());
        })
    }

    /// Fire `executions` async calls without waiting, then drain them
    pub fn non_blocking_async(&self, scenario: Scenario, executions: usize) -> PerformanceRun {
        let base = self.scenario_id(PerformanceMode::NonBlockingAsync, scenario);
        let id = ScenarioId::new(base.class(), format!("{}-{executions}", base.method()));
        let workload = self.workload.with_scenario(scenario);
        let tracker = Arc::new(CompletionTracker::new());

        let started = Instant::now();
        for _ in 0..executions {
            workload.dispatch(id.clone(), tracker.track());
        }
        tracker.await_zero();
        self.finish(id, executions, started)
    }

    /// Warm up, then every scenario in every selected mode
    ///
    /// Non-blocking batches run twice: once with the configured batch size
    /// and once with the pool size.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned.
    pub fn run(&self, modes: &[PerformanceMode]) -> Result<Vec<PerformanceRun>, ApplicationError> {
        let mut runs = vec![self.warm_up_pool()];
        for mode in modes {
            for scenario in Scenario::ALL {
                match mode {
                    PerformanceMode::BlockingSync => runs.push(self.blocking_sync(scenario)?),
                    PerformanceMode::BlockingAsync => runs.push(self.blocking_async(scenario)?),
                    PerformanceMode::NonBlockingAsync => {
                        runs.push(self.non_blocking_async(scenario, self.config.non_blocking_executions));
                        runs.push(self.non_blocking_async(scenario, self.config.max_pool_size));
                    },
                }
            }
        }
        Ok(runs)
    }

    fn fan_out<F>(&self, id: ScenarioId, call: F) -> Result<PerformanceRun, ApplicationError>
    where
        F: Fn(&ScenarioId) + Sync,
    {
        let executions = self.config.executions;
        let remaining = AtomicUsize::new(executions);
        let started = Instant::now();

        thread::scope(|scope| -> Result<(), ApplicationError> {
            for index in 0..self.config.workers.max(1) {
                let (remaining, call, id) = (&remaining, &call, &id);
                thread::Builder::new()
                    .name(format!("perf-{index}"))
                    .spawn_scoped(scope, move || {
                        while remaining
                            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                            .is_ok()
                        {
                            call(id);
                        }
                    })?;
            }
            Ok(())
        })?;

        Ok(self.finish(id, executions, started))
    }

    fn finish(&self, id: ScenarioId, executions: usize, started: Instant) -> PerformanceRun {
        let run = PerformanceRun {
            id,
            executions,
            elapsed: started.elapsed(),
        };
        let snapshot = self.workload.metrics().scenario(&run.id).snapshot();
        info!(
            scenario = %run.id,
            executions = run.executions,
            errors = snapshot.errors,
            mean_ms = snapshot.timer.mean.as_secs_f64() * 1000.0,
            throughput = run.throughput(),
            "Batch finished"
        );
        debug!(statuses = ?snapshot.statuses, "Batch status codes");
        run
    }
}
