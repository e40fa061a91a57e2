//! Shared rate limiter
//!
//! Permits are handed out on a fixed schedule spaced `1 / rate` apart. The
//! first permit is immediate and unused capacity is not stored, so a burst
//! after an idle period is still paced at the configured rate.

use std::time::{Duration, Instant};

use domain::{DomainError, RateSpec};
use parking_lot::Mutex;

/// Aggregate rate limiter shared by all workers of a runner
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_free: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for `rate_per_second` permits
    ///
    /// # Errors
    ///
    /// Returns an error if the rate is not a positive finite number or is
    /// slower than one permit per day.
    pub fn per_second(rate_per_second: f64) -> Result<Self, DomainError> {
        let spec = RateSpec::new(1, rate_per_second)?;
        Ok(Self::from_spec(&spec))
    }

    /// Create a limiter for the aggregate rate of `spec`
    #[must_use]
    pub fn from_spec(spec: &RateSpec) -> Self {
        Self {
            interval: spec.interval(),
            next_free: Mutex::new(None),
        }
    }

    /// Spacing between permits
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next permit without waiting for it
    ///
    /// Returns how long the caller must wait before using the permit.
    pub fn reserve(&self) -> Duration {
        let now = Instant::now();
        let mut next_free = self.next_free.lock();
        let slot = next_free.map_or(now, |next| next.max(now));
        // An unrepresentable instant leaves the schedule at `slot`.
        *next_free = Some(slot.checked_add(self.interval).unwrap_or(slot));
        slot.saturating_duration_since(now)
    }
}
