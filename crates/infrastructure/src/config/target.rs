//! Target, control plane and client settings.

use std::time::Duration;

use domain::base_url;
use serde::{Deserialize, Serialize};

/// Service under load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target host
    #[serde(default = "default_host")]
    pub host: String,

    /// Target port; also the port faults are injected in front of
    #[serde(default = "default_target_port")]
    pub port: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

const fn default_target_port() -> u16 {
    8080
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_target_port(),
        }
    }
}

impl TargetConfig {
    /// `http://host:port`
    pub fn base_url(&self) -> String {
        base_url(&self.host, self.port)
    }
}

/// Fault-injection proxy control endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// Control host (default: the target host)
    #[serde(default)]
    pub host: Option<String>,

    /// Control port
    #[serde(default = "default_control_port")]
    pub port: u16,
}

const fn default_control_port() -> u16 {
    6660
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_control_port(),
        }
    }
}

impl ControlPlaneConfig {
    /// Configured host, falling back to the target host
    pub fn host_or<'a>(&'a self, target: &'a TargetConfig) -> &'a str {
        self.host.as_deref().unwrap_or(&target.host)
    }
}

/// HTTP client tuning shared by every engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connection pool size
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: usize,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

const fn default_max_pool_size() -> usize {
    200
}

const fn default_connect_timeout_ms() -> u64 {
    5_000
}

const fn default_read_timeout_ms() -> u64 {
    50_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_pool_size: default_max_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Connect timeout
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
