//! Harness configuration
//!
//! Read once at start-up: built-in defaults, then an optional TOML file,
//! then `CLIENTBENCH_*` environment variables (`__` separates nested keys,
//! e.g. `CLIENTBENCH_TARGET__PORT=9090`). Immutable afterwards.

mod exercise;
mod observability;
mod target;

use std::path::Path;

use application::{ChaosSuiteConfig, PerformanceConfig};
use domain::RateSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use exercise::{ChaosConfig, ExerciseSection, PerformanceSection};
pub use observability::{LogFormat, LoggingConfig, MetricsConfig};
pub use target::{ClientConfig, ControlPlaneConfig, TargetConfig};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "clientbench";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CLIENTBENCH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Values were read but are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service under load
    #[serde(default)]
    pub target: TargetConfig,

    /// Fault-injection proxy
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,

    /// HTTP client tuning
    #[serde(default)]
    pub client: ClientConfig,

    /// Exercise timing and rate
    #[serde(default)]
    pub exercise: ExerciseSection,

    /// Fault scheduling
    #[serde(default)]
    pub chaos: ChaosConfig,

    /// Performance batches
    #[serde(default)]
    pub performance: PerformanceSection,

    /// Metrics reporting
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// With `path` the file must exist; without it `clientbench.toml` in
    /// the working directory is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, env: config::Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the harness cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.port == 0 {
            return Err(ConfigError::Invalid("target.port must not be 0".to_string()));
        }
        if self.control_plane.port == 0 {
            return Err(ConfigError::Invalid(
                "control_plane.port must not be 0".to_string(),
            ));
        }
        if self.client.max_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "client.max_pool_size must be at least 1".to_string(),
            ));
        }
        if self.exercise.workers == 0 || self.performance.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        self.exercise
            .exercise_config()
            .rate_spec()
            .map_err(|e| ConfigError::Invalid(format!("exercise: {e}")))?;
        if self.chaos.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "chaos.interval_secs must be at least 1".to_string(),
            ));
        }
        RateSpec::every(self.chaos.interval())
            .map_err(|e| ConfigError::Invalid(format!("chaos.interval_secs: {e}")))?;
        Ok(())
    }

    /// Control plane host, defaulting to the target host
    pub fn control_plane_host(&self) -> &str {
        self.control_plane.host_or(&self.target)
    }

    /// Chaos suite timing
    pub const fn chaos_suite_config(&self) -> ChaosSuiteConfig {
        ChaosSuiteConfig {
            exercise: self.exercise.exercise_config(),
            duration: self.exercise.duration(),
            warm_up: self.exercise.warm_up(),
            hold: self.chaos.hold(),
            interval: self.chaos.interval(),
            target_port: self.target.port,
        }
    }

    /// Performance batch sizes
    pub const fn performance_config(&self) -> PerformanceConfig {
        self.performance.performance_config(self.client.max_pool_size)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn env_from(pairs: &[(&str, &str)]) -> config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_harness() {
        let config = AppConfig::default();
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.target.port, 8080);
        assert_eq!(config.control_plane.port, 6660);
        assert_eq!(config.control_plane_host(), "localhost");
        assert_eq!(config.client.max_pool_size, 200);
        assert_eq!(config.client.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.client.read_timeout(), Duration::from_secs(50));
        assert_eq!(config.exercise.duration(), Duration::from_secs(60));
        assert_eq!(config.exercise.warm_up(), Duration::from_secs(5));
        assert_eq!(config.exercise.workers, 10);
        assert_eq!(config.chaos.hold(), Duration::from_secs(5));
        assert_eq!(config.chaos.interval(), Duration::from_secs(10));
        assert_eq!(config.performance.executions, 10_000);
        assert_eq!(config.performance.workers, 40);
        assert_eq!(config.performance.non_blocking_executions, 1_000);
        assert_eq!(config.metrics.report_interval(), Some(Duration::from_secs(30)));
        assert_eq!(config.metrics.prometheus_listen, None);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_without_sources_gives_defaults() {
        let config = AppConfig::load_from(None, env_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_toml(
            r#"
            [target]
            host = "bench-target"
            port = 9090

            [control_plane]
            host = "saboteur"

            [exercise]
            rate_per_second = 12.5

            [metrics]
            prometheus_listen = "127.0.0.1:9464"

            [logging]
            format = "json"
            "#,
        );

        let config = AppConfig::load_from(Some(file.path()), env_from(&[])).unwrap();

        assert_eq!(config.target.host, "bench-target");
        assert_eq!(config.target.port, 9090);
        assert_eq!(config.control_plane_host(), "saboteur");
        assert_eq!(config.control_plane.port, 6660);
        assert!((config.exercise.rate_per_second - 12.5).abs() < f64::EPSILON);
        assert_eq!(config.exercise.workers, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.metrics.prometheus_listen,
            Some("127.0.0.1:9464".parse().unwrap())
        );
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_toml("[target]\nport = 9090\n");
        let env = env_from(&[
            ("CLIENTBENCH_TARGET__PORT", "7070"),
            ("CLIENTBENCH_CONTROL_PLANE__PORT", "6661"),
        ]);

        let config = AppConfig::load_from(Some(file.path()), env).unwrap();

        assert_eq!(config.target.port, 7070);
        assert_eq!(config.control_plane.port, 6661);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = AppConfig::load_from(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn zero_port_is_rejected() {
        let file = write_toml("[target]\nport = 0\n");
        let err = AppConfig::load_from(Some(file.path()), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let mut config = AppConfig::default();
        config.exercise.rate_per_second = 0.0;
        assert!(config.validate().is_err());
        config.exercise.rate_per_second = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_rate_from_environment_is_rejected() {
        let err = AppConfig::load_from(
            None,
            env_from(&[("CLIENTBENCH_EXERCISE__RATE_PER_SECOND", "1e-20")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.starts_with("exercise:")));
    }

    #[test]
    fn chaos_interval_beyond_a_day_is_rejected() {
        let mut config = AppConfig::default();
        config.chaos.interval_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.chaos.interval_secs = 86_400;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_are_rejected() {
        let mut config = AppConfig::default();
        config.performance.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_report_interval_disables_periodic_reports() {
        let config = MetricsConfig {
            report_interval_secs: 0,
            ..MetricsConfig::default()
        };
        assert_eq!(config.report_interval(), None);
    }

    #[test]
    fn suite_configs_follow_sections() {
        let config = AppConfig::default();
        let chaos = config.chaos_suite_config();
        assert_eq!(chaos.target_port, 8080);
        assert_eq!(chaos.hold, Duration::from_secs(5));
        assert_eq!(config.performance_config().max_pool_size, 200);
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
