//! Rate specification for rate-limited task runners

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DomainError;

/// Longest permit spacing a spec may ask for
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Worker count and aggregate execution rate
///
/// The rate is global across all workers: `worker_count` workers together
/// never exceed `rate_per_second` executions per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSpec {
    worker_count: usize,
    rate_per_second: f64,
}

impl RateSpec {
    /// Create a validated rate spec
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidRateSpec` if `worker_count` is zero,
    /// `rate_per_second` is not a positive finite number, or the spacing
    /// between permits would exceed [`MAX_INTERVAL`].
    pub fn new(worker_count: usize, rate_per_second: f64) -> Result<Self, DomainError> {
        if worker_count == 0 {
            return Err(DomainError::invalid_rate("worker count must be at least 1"));
        }
        if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
            return Err(DomainError::invalid_rate(format!(
                "rate must be a positive number, got {rate_per_second}"
            )));
        }
        if !Duration::try_from_secs_f64(1.0 / rate_per_second)
            .is_ok_and(|interval| interval <= MAX_INTERVAL)
        {
            return Err(DomainError::invalid_rate(format!(
                "rate {rate_per_second}/s is below one permit per {}s",
                MAX_INTERVAL.as_secs()
            )));
        }
        Ok(Self {
            worker_count,
            rate_per_second,
        })
    }

    /// Single worker firing once every `period`
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is zero or longer than [`MAX_INTERVAL`].
    pub fn every(period: Duration) -> Result<Self, DomainError> {
        if period.is_zero() || period > MAX_INTERVAL {
            return Err(DomainError::invalid_rate(format!(
                "period must be between 0s and {}s, got {period:?}",
                MAX_INTERVAL.as_secs()
            )));
        }
        Self::new(1, 1.0 / period.as_secs_f64())
    }

    /// Number of worker threads
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Aggregate permits per second
    #[must_use]
    pub const fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    /// Spacing between two consecutive permits, at most [`MAX_INTERVAL`]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate_per_second)
            .map_or(MAX_INTERVAL, |interval| interval.min(MAX_INTERVAL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_spec() {
        let spec = RateSpec::new(10, 50.0).unwrap();
        assert_eq!(spec.worker_count(), 10);
        assert!((spec.rate_per_second() - 50.0).abs() < f64::EPSILON);
        assert_eq!(spec.interval(), Duration::from_millis(20));
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            RateSpec::new(0, 1.0),
            Err(DomainError::InvalidRateSpec(_))
        ));
    }

    #[test]
    fn non_positive_rate_rejected() {
        assert!(RateSpec::new(1, 0.0).is_err());
        assert!(RateSpec::new(1, -3.0).is_err());
        assert!(RateSpec::new(1, f64::NAN).is_err());
        assert!(RateSpec::new(1, f64::INFINITY).is_err());
    }

    #[test]
    fn every_ten_seconds() {
        let spec = RateSpec::every(Duration::from_secs(10)).unwrap();
        assert_eq!(spec.worker_count(), 1);
        assert!((spec.rate_per_second() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn every_zero_rejected() {
        assert!(RateSpec::every(Duration::ZERO).is_err());
    }

    #[test]
    fn tiny_rate_rejected_instead_of_overflowing() {
        assert!(matches!(
            RateSpec::new(1, 1e-20),
            Err(DomainError::InvalidRateSpec(_))
        ));
        assert!(RateSpec::new(1, f64::MIN_POSITIVE).is_err());
    }

    #[test]
    fn rates_slower_than_one_per_day_rejected() {
        let spec = RateSpec::new(1, 2.0 / MAX_INTERVAL.as_secs_f64()).unwrap();
        assert!(spec.interval() <= MAX_INTERVAL / 2 + Duration::from_millis(1));
        assert!(RateSpec::new(1, 0.5 / MAX_INTERVAL.as_secs_f64()).is_err());
    }

    #[test]
    fn every_rejects_periods_beyond_a_day() {
        assert!(RateSpec::every(MAX_INTERVAL).is_ok());
        assert!(RateSpec::every(MAX_INTERVAL + Duration::from_secs(1)).is_err());
        assert!(RateSpec::every(Duration::MAX).is_err());
    }

    #[test]
    fn deserialized_tiny_rate_interval_is_capped() {
        let spec: RateSpec =
            serde_json::from_str(r#"{"worker_count":1,"rate_per_second":1e-300}"#).unwrap();
        assert_eq!(spec.interval(), MAX_INTERVAL);
    }
}
