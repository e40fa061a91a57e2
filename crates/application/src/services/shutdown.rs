//! Cross-thread shutdown signal
//!
//! Lets a controlling thread interrupt workers that are sleeping until their
//! next rate-limiter permit or holding an injected fault.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Flag that sleeping threads can wait on
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: Mutex<bool>,
    changed: Condvar,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger the signal and wake every waiter
    pub fn trigger(&self) {
        let mut triggered = self.triggered.lock();
        *triggered = true;
        self.changed.notify_all();
    }

    /// Re-arm the signal for another run
    pub fn clear(&self) {
        *self.triggered.lock() = false;
    }

    /// Whether the signal has been triggered
    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock()
    }

    /// Sleep for `timeout` unless the signal fires first
    ///
    /// Returns `true` if the signal was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut triggered = self.triggered.lock();
        while !*triggered {
            if self.changed.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }
}
