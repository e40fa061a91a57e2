//! Tracing subscriber and metrics exporter setup
//!
//! Console logging through an `EnvFilter` plus a text or JSON `fmt` layer.
//! The `metrics` facade is exported in Prometheus format.

mod prometheus;
mod subscriber;

pub use prometheus::install_prometheus;
pub use subscriber::{TelemetryError, build_filter, init_tracing};
