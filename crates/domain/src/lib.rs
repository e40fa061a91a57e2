//! Domain layer for ClientBench
//!
//! Value types shared by the load harness: responses, rate and fault
//! specifications, scenario identities and measurement outcomes.
//! This layer has no I/O and defines the ubiquitous language.

pub mod errors;
pub mod payloads;
pub mod scenario;
pub mod value_objects;

pub use errors::DomainError;
pub use scenario::Scenario;
pub use value_objects::*;
