//! Completion tracking for in-flight work
//!
//! A counter of outstanding units of work that may be registered on one
//! thread and completed on another (typically an async executor thread).
//! [`CompletionTracker::await_zero`] blocks until every registered unit has
//! arrived, which is how an exercise drains its in-flight requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::warn;

/// Counter of outstanding work with a blocking wait for zero
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: AtomicUsize,
    lock: Mutex<()>,
    drained: Condvar,
}

impl CompletionTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
            lock: Mutex::new(()),
            drained: Condvar::new(),
        }
    }

    /// Register one unit of outstanding work
    pub fn register(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Mark one unit of work as completed
    ///
    /// Arrivals without a matching registration are ignored.
    pub fn arrive(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => {
                // Waiters check the counter while holding the lock, so taking it
                // here orders this wakeup after their check.
                let _guard = self.lock.lock();
                self.drained.notify_all();
            },
            Ok(_) => {},
            Err(_) => warn!("Completion arrived without a matching registration"),
        }
    }

    /// Register one unit and return a guard that arrives when dropped
    #[must_use = "dropping the guard immediately completes the unit"]
    pub fn track(self: &Arc<Self>) -> CompletionGuard {
        self.register();
        CompletionGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Number of units registered but not yet arrived
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Block until the outstanding count is zero
    pub fn await_zero(&self) {
        let mut guard = self.lock.lock();
        while self.outstanding() != 0 {
            self.drained.wait(&mut guard);
        }
    }

    /// Block until the outstanding count is zero or `timeout` elapses
    ///
    /// Returns `true` if the count reached zero.
    pub fn await_zero_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock();
        while self.outstanding() != 0 {
            if self.drained.wait_until(&mut guard, deadline).timed_out() {
                return self.outstanding() == 0;
            }
        }
        true
    }
}

/// One registered unit of work
///
/// Arrives exactly once: on [`CompletionGuard::complete`] or on drop,
/// including drops caused by panics or cancelled futures.
#[derive(Debug)]
pub struct CompletionGuard {
    tracker: Arc<CompletionTracker>,
}

impl CompletionGuard {
    /// Complete the unit explicitly
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.arrive();
    }
}
