//! Fault specification for the fault-injection control plane

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::DomainError;

/// Kind of fault the control plane can inject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultKind {
    /// Drop traffic to the target port
    NetworkFailure,
    /// Make the target service unavailable
    ServiceFailure,
}

impl FaultKind {
    /// Both fault kinds
    pub const ALL: [Self; 2] = [Self::NetworkFailure, Self::ServiceFailure];

    /// Fault name registered with the control plane
    #[must_use]
    pub const fn fault_name(&self) -> &'static str {
        match self {
            Self::NetworkFailure => "net-fail",
            Self::ServiceFailure => "service-fail",
        }
    }

    /// Wire representation of the kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkFailure => "NETWORK_FAILURE",
            Self::ServiceFailure => "SERVICE_FAILURE",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FaultKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "network" | "network-failure" | "net-fail" => Ok(Self::NetworkFailure),
            "service" | "service-failure" | "service-fail" => Ok(Self::ServiceFailure),
            _ => Err(DomainError::UnknownFaultKind(s.to_string())),
        }
    }
}

/// Traffic direction the fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Inbound traffic to the target port
    #[default]
    In,
    /// Outbound traffic from the target port
    Out,
}

/// A fault to inject and how long to hold it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultSpec {
    /// Fault kind
    pub kind: FaultKind,
    /// Traffic direction
    #[serde(default)]
    pub direction: Direction,
    /// Port of the service the fault targets
    pub target_port: u16,
    /// How long the fault stays active before it is reset
    pub duration: Duration,
}

impl FaultSpec {
    /// Create an inbound fault against `target_port`
    #[must_use]
    pub const fn new(kind: FaultKind, target_port: u16, duration: Duration) -> Self {
        Self {
            kind,
            direction: Direction::In,
            target_port,
            duration,
        }
    }

    /// Override the direction
    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Name registered with the control plane
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.fault_name()
    }

    /// Body of the inject request
    #[must_use]
    pub fn command(&self) -> FaultCommand {
        FaultCommand {
            name: self.name().to_string(),
            kind: self.kind,
            direction: self.direction,
            to_port: self.target_port,
        }
    }
}

/// Wire body of a fault-injection request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCommand {
    /// Fault name
    pub name: String,
    /// Fault kind
    #[serde(rename = "type")]
    pub kind: FaultKind,
    /// Traffic direction
    pub direction: Direction,
    /// Target port
    pub to_port: u16,
}
