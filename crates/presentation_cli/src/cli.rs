//! Command-line arguments

use std::net::SocketAddr;
use std::path::PathBuf;

use application::{ChaosExercise, PerformanceMode};
use clap::{Parser, Subcommand};
use domain::Scenario;
use infrastructure::{AppConfig, LogFormat};

/// ClientBench CLI
#[derive(Debug, Parser)]
#[command(name = "clientbench")]
#[command(author, version, about = "HTTP client load and chaos benchmark", long_about = None)]
pub struct Cli {
    /// Verbosity level (overrides the configured log filter)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to ./clientbench.toml if present)
    #[arg(short, long, global = true, env = "CLIENTBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Target port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Log output format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true, value_name = "ADDR")]
    pub prometheus_listen: Option<SocketAddr>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the chaos exercises
    ///
    /// Example: clientbench chaos --fault normal --fault network --duration 30
    Chaos {
        /// Exercises to run, in order (default: all)
        #[arg(short, long = "fault", value_name = "EXERCISE")]
        faults: Vec<ChaosExercise>,

        /// Request issued by every worker
        #[arg(short, long, default_value = "short-get")]
        scenario: Scenario,

        /// Seconds per exercise
        #[arg(short, long)]
        duration: Option<u64>,

        /// Requests per second
        #[arg(short, long)]
        rate: Option<f64>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Run the performance batches
    ///
    /// Example: clientbench perf --mode blocking-sync --executions 1000
    Perf {
        /// Modes to run, in order (default: all)
        #[arg(short, long = "mode", value_name = "MODE")]
        modes: Vec<PerformanceMode>,

        /// Requests per blocking batch
        #[arg(short, long)]
        executions: Option<usize>,

        /// Threads sharing a blocking batch
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

/// Log filter for a verbosity count, `None` keeps the configured filter
pub const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("clientbench=debug,application=debug,infrastructure=debug"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.target.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if let Some(addr) = self.prometheus_listen {
            config.metrics.prometheus_listen = Some(addr);
        }
        if let Some(filter) = log_filter_from_verbosity(self.verbose) {
            config.logging.filter = filter.to_string();
        }

        match &self.command {
            Commands::Chaos {
                duration,
                rate,
                workers,
                ..
            } => {
                if let Some(duration) = duration {
                    config.exercise.duration_secs = *duration;
                }
                if let Some(rate) = rate {
                    config.exercise.rate_per_second = *rate;
                }
                if let Some(workers) = workers {
                    config.exercise.workers = *workers;
                }
            },
            Commands::Perf {
                executions,
                workers,
                ..
            } => {
                if let Some(executions) = executions {
                    config.performance.executions = *executions;
                }
                if let Some(workers) = workers {
                    config.performance.workers = *workers;
                }
            },
        }
    }
}

/// Selected chaos exercises, all of them when none were named
pub fn chaos_selection(faults: &[ChaosExercise]) -> Vec<ChaosExercise> {
    if faults.is_empty() {
        ChaosExercise::ALL.to_vec()
    } else {
        faults.to_vec()
    }
}

/// Selected performance modes, all of them when none were named
pub fn mode_selection(modes: &[PerformanceMode]) -> Vec<PerformanceMode> {
    if modes.is_empty() {
        PerformanceMode::ALL.to_vec()
    } else {
        modes.to_vec()
    }
}
