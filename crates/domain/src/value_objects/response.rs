//! HTTP response value object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code the harness treats as success
pub const STATUS_OK: u16 = 200;

/// Status and body of a completed HTTP exchange
///
/// Produced by a client engine and owned by the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Response {
    status: u16,
    body: String,
}

impl Response {
    /// Create a new response
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// HTTP status code
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response body
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consume the response, returning the body
    #[must_use]
    pub fn into_body(self) -> String {
        self.body
    }

    /// Whether the status is exactly 200
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.status, self.body)
    }
}

/// Base URL for a plain HTTP target
#[must_use]
pub fn base_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}
