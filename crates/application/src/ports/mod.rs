//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod client_engine;

pub use client_engine::{BlockingClientExt, ClientEngine, ClientEngineFactory, EngineError};
#[cfg(test)]
pub use client_engine::{MockClientEngine, MockClientEngineFactory};
