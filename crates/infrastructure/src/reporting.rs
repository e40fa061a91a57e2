//! Periodic metrics reporter
//!
//! Logs a snapshot of every scenario on a fixed interval and once more when
//! stopped.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use application::{MetricsRegistry, ScenarioSnapshot, ShutdownSignal};
use tracing::{debug, info, warn};

/// Logs scenario snapshots from a background thread
#[derive(Debug)]
pub struct MetricsReporter {
    registry: Arc<MetricsRegistry>,
    shutdown: Arc<ShutdownSignal>,
    reports: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

impl MetricsReporter {
    /// Start reporting every `interval`
    ///
    /// With `None` nothing is logged until [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns an error if the reporter thread cannot be spawned.
    pub fn start(
        registry: Arc<MetricsRegistry>,
        interval: Option<Duration>,
    ) -> std::io::Result<Self> {
        let shutdown = Arc::new(ShutdownSignal::new());
        let reports = Arc::new(AtomicU64::new(0));

        let handle = match interval {
            Some(interval) => {
                let registry = Arc::clone(&registry);
                let shutdown = Arc::clone(&shutdown);
                let reports = Arc::clone(&reports);
                let handle = thread::Builder::new()
                    .name("metrics-reporter".to_string())
                    .spawn(move || {
                        debug!(interval_secs = interval.as_secs_f64(), "Metrics reporter started");
                        while !shutdown.wait_timeout(interval) {
                            report(&registry, &reports);
                        }
                    })?;
                Some(handle)
            },
            None => None,
        };

        Ok(Self {
            registry,
            shutdown,
            reports,
            handle,
            stopped: false,
        })
    }

    /// Number of reports logged so far
    pub fn reports(&self) -> u64 {
        self.reports.load(Ordering::Acquire)
    }

    /// Stop the background thread and log a final report
    ///
    /// Later calls are no-ops.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Metrics reporter thread panicked");
        }
        report(&self.registry, &self.reports);
    }
}

impl Drop for MetricsReporter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn report(registry: &MetricsRegistry, reports: &AtomicU64) {
    let snapshots = registry.snapshot();
    for snapshot in &snapshots {
        info!(
            scenario = %snapshot.id,
            count = snapshot.timer.count,
            mean_ms = millis(snapshot.timer.mean),
            min_ms = millis(snapshot.timer.min),
            max_ms = millis(snapshot.timer.max),
            p50_ms = millis(snapshot.timer.p50),
            p95_ms = millis(snapshot.timer.p95),
            p99_ms = millis(snapshot.timer.p99),
            rate_per_sec = snapshot.mean_rate(),
            errors = snapshot.errors,
            error_rate = snapshot.error_rate(),
            app_errors = snapshot.app_errors,
            statuses = %format_statuses(snapshot),
            "Scenario metrics"
        );
    }
    reports.fetch_add(1, Ordering::AcqRel);
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

/// Render status counts as `200=10 503=2`
pub fn format_statuses(snapshot: &ScenarioSnapshot) -> String {
    let mut out = String::new();
    for (status, count) in &snapshot.statuses {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{status}={count}");
    }
    out
}
