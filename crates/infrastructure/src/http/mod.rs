//! HTTP client engines
//!
//! Concrete implementations of the `ClientEngine` port.

mod reqwest_engine;

pub use reqwest_engine::{ENGINE_NAME, ReqwestEngine, ReqwestEngineConfig, ReqwestEngineFactory};
