//! Rate-limited task runner
//!
//! Runs a task repeatedly on a fixed set of worker threads that share a
//! single [`RateLimiter`]. Failures and panics inside the task are counted at
//! the worker boundary so they never shrink the runner's concurrency.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use domain::RateSpec;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{CompletionTracker, RateLimiter, ShutdownSignal};
use crate::error::ApplicationError;

/// Unit of work executed once per permit
pub type Task = Arc<dyn Fn() -> Result<(), ApplicationError> + Send + Sync>;

/// How long `stop` waits for workers before abandoning them
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Execution counters of a runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Task executions started
    pub executions: u64,
    /// Executions that returned an error or panicked
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    executions: AtomicU64,
    failures: AtomicU64,
}

struct RunnerState {
    running: Arc<AtomicBool>,
    shutdown: Arc<ShutdownSignal>,
    live_workers: Arc<CompletionTracker>,
    workers: Vec<JoinHandle<()>>,
}

/// Runs a task across `worker_count` threads at an aggregate rate
///
/// `start` on a running instance and `stop` on a stopped one are no-ops.
/// Dropping the runner stops it.
pub struct RateLimitedTaskRunner {
    name: String,
    spec: RateSpec,
    task: Task,
    stop_timeout: Duration,
    counters: Arc<Counters>,
    state: Mutex<Option<RunnerState>>,
}

impl fmt::Debug for RateLimitedTaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedTaskRunner")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl RateLimitedTaskRunner {
    /// Create a stopped runner
    pub fn new<F>(name: impl Into<String>, spec: RateSpec, task: F) -> Self
    where
        F: Fn() -> Result<(), ApplicationError> + Send + Sync + 'static,
    {
        Self::with_task(name, spec, Arc::new(task))
    }

    /// Create a stopped runner from a shared task
    pub fn with_task(name: impl Into<String>, spec: RateSpec, task: Task) -> Self {
        Self {
            name: name.into(),
            spec,
            task,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            counters: Arc::new(Counters::default()),
            state: Mutex::new(None),
        }
    }

    /// Override how long `stop` waits for workers
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Runner name, used for thread names and logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worker count and rate
    pub const fn spec(&self) -> &RateSpec {
        &self.spec
    }

    /// Whether workers are currently running
    pub fn is_running(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Counters accumulated over every run of this instance
    pub fn stats(&self) -> RunnerStats {
        RunnerStats {
            executions: self.counters.executions.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Spawn the workers
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned; workers spawned
    /// before the failure are stopped again.
    pub fn start(&self) -> Result<(), ApplicationError> {
        let mut state = self.state.lock();
        if state.is_some() {
            debug!(runner = %self.name, "Runner already started");
            return Ok(());
        }

        let limiter = Arc::new(RateLimiter::from_spec(&self.spec));
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(ShutdownSignal::new());
        let live_workers = Arc::new(CompletionTracker::new());
        let mut workers = Vec::with_capacity(self.spec.worker_count());

        for index in 0..self.spec.worker_count() {
            let worker = Worker {
                runner: self.name.clone(),
                task: Arc::clone(&self.task),
                limiter: Arc::clone(&limiter),
                running: Arc::clone(&running),
                shutdown: Arc::clone(&shutdown),
                counters: Arc::clone(&self.counters),
            };
            let alive = live_workers.track();

            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", self.name))
                .spawn(move || {
                    let _alive = alive;
                    worker.run();
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    running.store(false, Ordering::Release);
                    shutdown.trigger();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(e.into());
                },
            }
        }

        info!(
            runner = %self.name,
            workers = self.spec.worker_count(),
            rate = self.spec.rate_per_second(),
            "Runner started"
        );

        *state = Some(RunnerState {
            running,
            shutdown,
            live_workers,
            workers,
        });
        Ok(())
    }

    /// Stop producing new work
    ///
    /// Wakes every worker and waits up to the stop timeout for them to exit.
    /// Workers still busy after that are abandoned. Work already handed to a
    /// client engine is not cancelled.
    pub fn stop(&self) {
        let Some(state) = self.state.lock().take() else {
            return;
        };

        state.running.store(false, Ordering::Release);
        state.shutdown.trigger();

        if state.live_workers.await_zero_timeout(self.stop_timeout) {
            for handle in state.workers {
                if handle.join().is_err() {
                    warn!(runner = %self.name, "Worker thread panicked");
                }
            }
        } else {
            warn!(
                runner = %self.name,
                remaining = state.live_workers.outstanding(),
                "Workers did not stop in time, abandoning them"
            );
        }

        let stats = self.stats();
        info!(
            runner = %self.name,
            executions = stats.executions,
            failures = stats.failures,
            "Runner stopped"
        );
    }
}

impl Drop for RateLimitedTaskRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    runner: String,
    task: Task,
    limiter: Arc<RateLimiter>,
    running: Arc<AtomicBool>,
    shutdown: Arc<ShutdownSignal>,
    counters: Arc<Counters>,
}

impl Worker {
    fn run(&self) {
        while self.running.load(Ordering::Acquire) {
            let wait = self.limiter.reserve();
            if self.shutdown.wait_timeout(wait) || !self.running.load(Ordering::Acquire) {
                break;
            }
            self.execute();
        }
    }

    fn execute(&self) {
        self.counters.executions.fetch_add(1, Ordering::Relaxed);

        match panic::catch_unwind(AssertUnwindSafe(|| (self.task)())) {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(runner = %self.runner, error = %e, "Task failed");
            },
            Err(payload) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    runner = %self.runner,
                    panic = %panic_message(payload.as_ref()),
                    "Task panicked"
                );
            },
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
