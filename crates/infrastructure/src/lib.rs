//! Infrastructure layer - Adapters for external systems
//!
//! Implements the client engine port on top of reqwest and carries the
//! ambient pieces: configuration loading, tracing setup and periodic
//! metrics reporting.

pub mod config;
pub mod http;
pub mod reporting;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, LogFormat, LoggingConfig, MetricsConfig};
pub use http::{ReqwestEngine, ReqwestEngineConfig, ReqwestEngineFactory};
pub use reporting::MetricsReporter;
pub use telemetry::{TelemetryError, init_tracing, install_prometheus};
