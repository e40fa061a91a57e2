//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Worker count or rate outside of the accepted range
    #[error("Invalid rate spec: {0}")]
    InvalidRateSpec(String),

    /// Unknown fault kind name
    #[error("Unknown fault kind: {0}")]
    UnknownFaultKind(String),

    /// Unknown scenario name
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

impl DomainError {
    /// Create a rate spec error
    pub fn invalid_rate(reason: impl Into<String>) -> Self {
        Self::InvalidRateSpec(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rate_creates_correct_error() {
        let err = DomainError::invalid_rate("worker count must be at least 1");
        assert_eq!(
            err,
            DomainError::InvalidRateSpec("worker count must be at least 1".to_string())
        );
    }

    #[test]
    fn invalid_rate_error_message() {
        let err = DomainError::invalid_rate("rate must be positive");
        assert_eq!(err.to_string(), "Invalid rate spec: rate must be positive");
    }

    #[test]
    fn unknown_fault_kind_error_message() {
        let err = DomainError::UnknownFaultKind("latency".to_string());
        assert_eq!(err.to_string(), "Unknown fault kind: latency");
    }

    #[test]
    fn unknown_scenario_error_message() {
        let err = DomainError::UnknownScenario("huge-get".to_string());
        assert_eq!(err.to_string(), "Unknown scenario: huge-get");
    }
}
