//! Scenario identity used to key metrics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a measured scenario: suite class plus method name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId {
    class: String,
    method: String,
}

impl ScenarioId {
    /// Create a new scenario identity
    #[must_use]
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Suite class
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Method name
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Dotted metric name with a trailing component, e.g. `chaos.reqwest.normal.timing`
    #[must_use]
    pub fn metric_name(&self, suffix: &str) -> String {
        format!("{}.{}.{suffix}", self.class, self.method)
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.method)
    }
}
