//! Classified result of a single task execution

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How one request ended, as far as metrics are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Status 200 and the expected body
    Success(Duration),
    /// Engine error, non-200 status, or the response handling itself failed
    TransportFailure,
    /// Status 200 but the body differs from the expected payload
    ApplicationMismatch(Duration),
}

impl Outcome {
    /// Latency that belongs in the timer, if any
    ///
    /// Only successes are timed; failures short-circuit real work.
    #[must_use]
    pub const fn timed_latency(&self) -> Option<Duration> {
        match self {
            Self::Success(latency) => Some(*latency),
            Self::TransportFailure | Self::ApplicationMismatch(_) => None,
        }
    }

    /// Whether the transport-level error counter is bumped
    #[must_use]
    pub const fn is_error(&self) -> bool {
        !matches!(self, Self::Success(_))
    }

    /// Whether the application mismatch counter is bumped
    #[must_use]
    pub const fn is_app_error(&self) -> bool {
        matches!(self, Self::ApplicationMismatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_timed_and_not_an_error() {
        let outcome = Outcome::Success(Duration::from_millis(3));
        assert_eq!(outcome.timed_latency(), Some(Duration::from_millis(3)));
        assert!(!outcome.is_error());
        assert!(!outcome.is_app_error());
    }

    #[test]
    fn mismatch_counts_as_both_errors_without_timing() {
        let outcome = Outcome::ApplicationMismatch(Duration::from_millis(3));
        assert_eq!(outcome.timed_latency(), None);
        assert!(outcome.is_error());
        assert!(outcome.is_app_error());
    }

    #[test]
    fn transport_failure_is_plain_error() {
        let outcome = Outcome::TransportFailure;
        assert!(outcome.is_error());
        assert!(!outcome.is_app_error());
    }
}
