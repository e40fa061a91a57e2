//! Exercise controller
//!
//! Runs a task at a fixed rate for a bounded wall-clock duration, then waits
//! until every asynchronous completion started by that run has arrived.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use domain::{DomainError, RateSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{CompletionGuard, CompletionTracker, RateLimitedTaskRunner};
use crate::error::ApplicationError;

/// Worker count and rate of an exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    /// Worker threads sharing the rate
    pub workers: usize,
    /// Aggregate executions per second
    pub rate_per_second: f64,
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            rate_per_second: 50.0,
        }
    }
}

impl ExerciseConfig {
    /// Validated rate spec
    ///
    /// # Errors
    ///
    /// Returns an error if the worker count or rate is invalid.
    pub fn rate_spec(&self) -> Result<RateSpec, DomainError> {
        RateSpec::new(self.workers, self.rate_per_second)
    }
}

/// What happened during one exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseSummary {
    /// Task invocations
    pub executions: u64,
    /// Invocations that returned an error or panicked synchronously
    pub failures: u64,
    /// Wall-clock time including the drain
    pub elapsed: Duration,
}

/// Bounded, drained exercise runs
///
/// Each task invocation receives a [`CompletionGuard`]. Whoever finishes the
/// work drops it; `run` does not return until all guards are gone.
#[derive(Debug)]
pub struct ExerciseController {
    name: String,
    spec: RateSpec,
    tracker: Arc<CompletionTracker>,
}

impl ExerciseController {
    /// Create a controller from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(name: impl Into<String>, config: &ExerciseConfig) -> Result<Self, ApplicationError> {
        Ok(Self::from_spec(name, config.rate_spec()?))
    }

    /// Create a controller from an already validated rate spec
    pub fn from_spec(name: impl Into<String>, spec: RateSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            tracker: Arc::new(CompletionTracker::new()),
        }
    }

    /// Outstanding work of the current run
    pub const fn tracker(&self) -> &Arc<CompletionTracker> {
        &self.tracker
    }

    /// Worker count and rate
    pub const fn spec(&self) -> &RateSpec {
        &self.spec
    }

    /// Run `task` for `duration` and drain its completions
    ///
    /// # Errors
    ///
    /// Returns an error only if the runner or the deadline timer cannot be
    /// started. Failing task invocations are counted, not raised.
    #[instrument(skip(self, task), fields(exercise = %self.name))]
    pub fn run<F>(&self, duration: Duration, task: F) -> Result<ExerciseSummary, ApplicationError>
    where
        F: Fn(CompletionGuard) -> Result<(), ApplicationError> + Send + Sync + 'static,
    {
        let started = Instant::now();
        let own = self.tracker.track();

        let tracker = Arc::clone(&self.tracker);
        let runner = Arc::new(RateLimitedTaskRunner::new(
            self.name.clone(),
            self.spec,
            move || task(tracker.track()),
        ));
        runner.start()?;

        let deadline_runner = Arc::clone(&runner);
        let timer = thread::Builder::new()
            .name(format!("{}-deadline", self.name))
            .spawn(move || {
                thread::sleep(duration);
                deadline_runner.stop();
            });

        match timer {
            Ok(handle) => {
                if handle.join().is_err() {
                    runner.stop();
                }
            },
            Err(e) => {
                runner.stop();
                drop(own);
                self.tracker.await_zero();
                return Err(e.into());
            },
        }

        runner.stop();
        own.complete();
        self.tracker.await_zero();

        let stats = runner.stats();
        let summary = ExerciseSummary {
            executions: stats.executions,
            failures: stats.failures,
            elapsed: started.elapsed(),
        };
        info!(
            executions = summary.executions,
            failures = summary.failures,
            elapsed_ms = summary.elapsed.as_millis(),
            "Exercise finished"
        );
        Ok(summary)
    }

    /// Same mechanics as [`run`](Self::run), used to prime connection pools
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn warm_up<F>(&self, duration: Duration, task: F) -> Result<ExerciseSummary, ApplicationError>
    where
        F: Fn(CompletionGuard) -> Result<(), ApplicationError> + Send + Sync + 'static,
    {
        info!(exercise = %self.name, secs = duration.as_secs_f64(), "Warming up");
        self.run(duration, task)
    }
}
