//! Application layer - load harness and orchestration
//!
//! Contains the rate-limited runner, exercise controller, metrics
//! classification and fault-injection scheduling, plus the client engine
//! port that infrastructure adapters implement.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
