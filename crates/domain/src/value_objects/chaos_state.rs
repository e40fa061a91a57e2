//! Fault-injection lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the chaos scheduler
///
/// Every entry into `Injecting` must be followed by `Resetting`, whether or
/// not the inject command succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChaosState {
    /// No fault requested
    #[default]
    Idle,
    /// Inject command issued or fault being held
    Injecting,
    /// Reset command being issued
    Resetting,
}

impl ChaosState {
    /// Whether moving to `next` is a legal transition
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Injecting | Self::Resetting)
                | (Self::Injecting, Self::Resetting)
                | (Self::Resetting, Self::Idle)
        )
    }
}

impl fmt::Display for ChaosState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Injecting => write!(f, "injecting"),
            Self::Resetting => write!(f, "resetting"),
        }
    }
}
