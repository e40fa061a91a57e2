//! Chaos scheduler
//!
//! Periodically injects a fault through the control plane, holds it, then
//! resets it. The reset is tied to a [`FaultLease`] so it is issued on every
//! exit path of a cycle, including a failed inject and unwinding.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use domain::{ChaosState, FaultSpec, RateSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{FaultControlPlane, RateLimitedTaskRunner, ShutdownSignal};
use crate::error::ApplicationError;

/// Default hold period of an injected fault
pub const DEFAULT_HOLD: Duration = Duration::from_secs(5);
/// Default period between cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Counters of a scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosStats {
    /// Inject commands issued
    pub injections: u64,
    /// Inject commands that failed or were rejected
    pub failed_injections: u64,
    /// Reset commands issued
    pub resets: u64,
    /// Reset commands that could not be delivered
    pub failed_resets: u64,
}

#[derive(Debug, Default)]
struct Counters {
    injections: AtomicU64,
    failed_injections: AtomicU64,
    resets: AtomicU64,
    failed_resets: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    control: FaultControlPlane,
    fault: FaultSpec,
    state: Mutex<ChaosState>,
    hold: ShutdownSignal,
    counters: Counters,
}

impl Inner {
    fn transition(&self, next: ChaosState) {
        let mut state = self.state.lock();
        if state.can_transition_to(next) {
            debug!(from = %*state, to = %next, "Chaos state change");
            *state = next;
        } else {
            debug!(from = %*state, to = %next, "Ignoring chaos state change");
        }
    }

    fn cycle(&self) -> Result<(), ApplicationError> {
        let lease = FaultLease::acquire(self);
        self.inject()?;

        if self.hold.wait_timeout(self.fault.duration) {
            debug!("Fault hold interrupted");
        }
        lease.release()
    }

    fn inject(&self) -> Result<(), ApplicationError> {
        self.counters.injections.fetch_add(1, Ordering::Relaxed);
        self.control.inject(&self.fault).inspect_err(|e| {
            self.counters.failed_injections.fetch_add(1, Ordering::Relaxed);
            warn!(fault = self.fault.name(), error = %e, "Fault injection failed");
        })
    }

    fn reset(&self) -> Result<(), ApplicationError> {
        self.transition(ChaosState::Resetting);
        self.counters.resets.fetch_add(1, Ordering::Relaxed);
        let result = self.control.reset();
        self.transition(ChaosState::Idle);

        result.map(|_| ()).inspect_err(|e| {
            self.counters.failed_resets.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Fault reset failed");
        })
    }
}

/// An injected (or attempted) fault that must be reset
///
/// `release` resets explicitly and reports the outcome; dropping an
/// unreleased lease resets and only logs.
struct FaultLease<'a> {
    inner: &'a Inner,
    released: bool,
}

impl<'a> FaultLease<'a> {
    fn acquire(inner: &'a Inner) -> Self {
        inner.transition(ChaosState::Injecting);
        Self {
            inner,
            released: false,
        }
    }

    fn release(mut self) -> Result<(), ApplicationError> {
        self.released = true;
        self.inner.reset()
    }
}

impl Drop for FaultLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.inner.reset();
        }
    }
}

/// Periodic fault injection running next to an exercise
#[derive(Debug)]
pub struct ChaosScheduler {
    inner: Arc<Inner>,
    runner: RateLimitedTaskRunner,
}

impl ChaosScheduler {
    /// Create a scheduler running one cycle per `interval`
    ///
    /// # Errors
    ///
    /// Returns an error if `interval` is zero.
    pub fn new(
        control: FaultControlPlane,
        fault: FaultSpec,
        interval: Duration,
    ) -> Result<Self, ApplicationError> {
        let inner = Arc::new(Inner {
            control,
            fault,
            state: Mutex::new(ChaosState::Idle),
            hold: ShutdownSignal::new(),
            counters: Counters::default(),
        });

        let cycle_inner = Arc::clone(&inner);
        let runner = RateLimitedTaskRunner::new(
            format!("chaos-{}", fault.name()),
            RateSpec::every(interval)?,
            move || cycle_inner.cycle(),
        );

        Ok(Self { inner, runner })
    }

    /// Fault this scheduler injects
    pub fn fault(&self) -> &FaultSpec {
        &self.inner.fault
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChaosState {
        *self.inner.state.lock()
    }

    /// Counters so far
    pub fn stats(&self) -> ChaosStats {
        let counters = &self.inner.counters;
        ChaosStats {
            injections: counters.injections.load(Ordering::Relaxed),
            failed_injections: counters.failed_injections.load(Ordering::Relaxed),
            resets: counters.resets.load(Ordering::Relaxed),
            failed_resets: counters.failed_resets.load(Ordering::Relaxed),
        }
    }

    /// Run one inject, hold, reset round on the calling thread
    ///
    /// # Errors
    ///
    /// Returns the inject error if the control plane rejected the fault,
    /// after the reset has been issued, or the reset error.
    pub fn cycle(&self) -> Result<(), ApplicationError> {
        self.inner.cycle()
    }

    /// Start periodic cycles; the first one begins immediately
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler thread cannot be spawned.
    pub fn start(&self) -> Result<(), ApplicationError> {
        self.inner.hold.clear();
        self.runner.start()?;
        info!(
            fault = self.inner.fault.name(),
            to_port = self.inner.fault.target_port,
            "Chaos scheduler started"
        );
        Ok(())
    }

    /// Stop cycling and issue one final unconditional reset
    pub fn stop(&self) {
        self.inner.hold.trigger();
        self.runner.stop();
        let _ = self.inner.reset();

        let stats = self.stats();
        info!(
            fault = self.inner.fault.name(),
            injections = stats.injections,
            failed_injections = stats.failed_injections,
            resets = stats.resets,
            "Chaos scheduler stopped"
        );
    }

    /// Run `f` with chaos active
    ///
    /// The scheduler is stopped and the final reset issued even if `f`
    /// fails or panics.
    ///
    /// # Errors
    ///
    /// Returns the start error or whatever `f` returns.
    pub fn around<T, F>(&self, f: F) -> Result<T, ApplicationError>
    where
        F: FnOnce() -> Result<T, ApplicationError>,
    {
        self.start()?;
        let _stop = StopOnDrop(self);
        f()
    }
}

struct StopOnDrop<'a>(&'a ChaosScheduler);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}
