//! Application-level errors

use domain::DomainError;
use thiserror::Error;

use crate::ports::EngineError;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Client engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Control plane rejected a fault-injection command
    #[error("Failed to inject chaos. Expected 200, got {status}.")]
    FaultInjection {
        /// Status returned by the control plane
        status: u16,
    },

    /// Worker or timer thread could not be started
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether this error originates from the fault-injection control plane
    pub const fn is_fault_injection(&self) -> bool {
        matches!(self, Self::FaultInjection { .. })
    }
}
