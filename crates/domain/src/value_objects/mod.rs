//! Value Objects - Immutable, identity-less domain primitives

mod chaos_state;
mod fault_spec;
mod outcome;
mod rate_spec;
mod response;
mod scenario_id;

pub use chaos_state::ChaosState;
pub use fault_spec::{Direction, FaultCommand, FaultKind, FaultSpec};
pub use outcome::Outcome;
pub use rate_spec::{MAX_INTERVAL, RateSpec};
pub use response::{Response, base_url};
pub use scenario_id::ScenarioId;
