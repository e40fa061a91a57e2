//! Per-scenario metrics and outcome classification
//!
//! Every scenario gets an HDR latency timer, a transport-level error
//! counter, an application mismatch counter and a per-status response
//! counter. Records are mirrored to the `metrics` facade so an installed
//! exporter sees them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use domain::{Outcome, Response, ScenarioId};
use hdrhistogram::Histogram;
use metrics::{counter, histogram};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::ports::EngineError;

/// Histogram of successful request latencies, in seconds
pub const LATENCY_METRIC: &str = "clientbench_latency_seconds";
/// Error counter, labelled by `kind` (`transport` or `application`)
pub const ERRORS_METRIC: &str = "clientbench_errors_total";
/// Response counter, labelled by `status`
pub const RESPONSES_METRIC: &str = "clientbench_responses_total";

/// Classify one request result against the expected payload
///
/// Any engine error or non-200 status is a transport failure. A 200 whose
/// body differs from `expected` is an application mismatch.
pub fn classify(result: &Result<Response, EngineError>, expected: &str, latency: Duration) -> Outcome {
    match result {
        Err(_) => Outcome::TransportFailure,
        Ok(response) if !response.is_ok() => Outcome::TransportFailure,
        Ok(response) if response.body() != expected => Outcome::ApplicationMismatch(latency),
        Ok(_) => Outcome::Success(latency),
    }
}

/// Slowest latency the timer resolves, in microseconds (one hour)
const TIMER_MAX_US: u64 = 3_600_000_000;
/// Significant decimal digits kept by the timer
const TIMER_SIGFIGS: u8 = 3;

/// HDR latency histogram with microsecond resolution
///
/// Samples beyond one hour are clamped. Quantiles are accurate to three
/// significant digits.
#[derive(Debug)]
pub struct LatencyTimer {
    histogram: Mutex<Histogram<u64>>,
}

impl Default for LatencyTimer {
    #[allow(clippy::expect_used)] // Infallible with valid static bounds
    fn default() -> Self {
        let histogram = Histogram::new_with_bounds(1, TIMER_MAX_US, TIMER_SIGFIGS)
            .expect("static histogram bounds are valid");
        Self {
            histogram: Mutex::new(histogram),
        }
    }
}

impl LatencyTimer {
    /// Add one sample
    pub fn record(&self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.histogram.lock().saturating_record(us);
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.histogram.lock().len()
    }

    /// Point-in-time view
    pub fn snapshot(&self) -> TimerSnapshot {
        let histogram = self.histogram.lock();
        if histogram.is_empty() {
            return TimerSnapshot::default();
        }
        let at = |quantile: f64| Duration::from_micros(histogram.value_at_quantile(quantile));
        TimerSnapshot {
            count: histogram.len(),
            mean: Duration::try_from_secs_f64(histogram.mean() / 1_000_000.0).unwrap_or_default(),
            min: Duration::from_micros(histogram.min()),
            max: Duration::from_micros(histogram.max()),
            p50: at(0.50),
            p75: at(0.75),
            p95: at(0.95),
            p99: at(0.99),
        }
    }
}

/// Latency summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    /// Samples recorded
    pub count: u64,
    /// Mean latency
    pub mean: Duration,
    /// Fastest sample
    pub min: Duration,
    /// Slowest sample
    pub max: Duration,
    /// Median
    pub p50: Duration,
    /// 75th percentile
    pub p75: Duration,
    /// 95th percentile
    pub p95: Duration,
    /// 99th percentile
    pub p99: Duration,
}

/// Metrics of one scenario
#[derive(Debug)]
pub struct ScenarioMetrics {
    id: ScenarioId,
    timer: LatencyTimer,
    errors: AtomicU64,
    app_errors: AtomicU64,
    statuses: Mutex<BTreeMap<u16, u64>>,
    created: Instant,
}

impl ScenarioMetrics {
    fn new(id: ScenarioId) -> Self {
        Self {
            id,
            timer: LatencyTimer::default(),
            errors: AtomicU64::new(0),
            app_errors: AtomicU64::new(0),
            statuses: Mutex::new(BTreeMap::new()),
            created: Instant::now(),
        }
    }

    /// Scenario identity
    pub const fn id(&self) -> &ScenarioId {
        &self.id
    }

    /// Apply one classified outcome
    pub fn record(&self, outcome: Outcome) {
        let scenario = self.id.to_string();

        if let Some(latency) = outcome.timed_latency() {
            self.timer.record(latency);
            histogram!(LATENCY_METRIC, "scenario" => scenario.clone()).record(latency.as_secs_f64());
        }
        if outcome.is_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
            counter!(ERRORS_METRIC, "scenario" => scenario.clone(), "kind" => "transport").increment(1);
        }
        if outcome.is_app_error() {
            self.app_errors.fetch_add(1, Ordering::Relaxed);
            counter!(ERRORS_METRIC, "scenario" => scenario, "kind" => "application").increment(1);
        }
    }

    /// Count one response by status code
    pub fn record_status(&self, status: u16) {
        *self.statuses.lock().entry(status).or_insert(0) += 1;
        counter!(
            RESPONSES_METRIC,
            "scenario" => self.id.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }

    /// Transport-level errors, including mismatches
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Application payload mismatches
    pub fn app_errors(&self) -> u64 {
        self.app_errors.load(Ordering::Relaxed)
    }

    /// Point-in-time view
    pub fn snapshot(&self) -> ScenarioSnapshot {
        ScenarioSnapshot {
            id: self.id.clone(),
            timer: self.timer.snapshot(),
            errors: self.errors(),
            app_errors: self.app_errors(),
            statuses: self.statuses.lock().clone(),
            elapsed: self.created.elapsed(),
        }
    }
}

/// Snapshot of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioSnapshot {
    /// Scenario identity
    pub id: ScenarioId,
    /// Latency of successful requests
    pub timer: TimerSnapshot,
    /// Transport-level errors
    pub errors: u64,
    /// Application mismatches
    pub app_errors: u64,
    /// Responses per status code
    pub statuses: BTreeMap<u16, u64>,
    /// Time since the scenario was first recorded
    pub elapsed: Duration,
}

impl ScenarioSnapshot {
    /// Successful requests per second since the scenario started
    pub fn mean_rate(&self) -> f64 {
        self.per_second(self.timer.count)
    }

    /// Transport errors per second since the scenario started
    pub fn error_rate(&self) -> f64 {
        self.per_second(self.errors)
    }

    /// Application mismatches per second since the scenario started
    pub fn app_error_rate(&self) -> f64 {
        self.per_second(self.app_errors)
    }

    #[allow(clippy::cast_precision_loss)]
    fn per_second(&self, count: u64) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { count as f64 / secs } else { 0.0 }
    }
}

/// Registry of scenario metrics
///
/// Entries are created on first use and live as long as the registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    scenarios: RwLock<HashMap<ScenarioId, Arc<ScenarioMetrics>>>,
}

impl MetricsRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics for `id`, created on first use
    pub fn scenario(&self, id: &ScenarioId) -> Arc<ScenarioMetrics> {
        if let Some(existing) = self.scenarios.read().get(id) {
            return Arc::clone(existing);
        }
        let mut scenarios = self.scenarios.write();
        Arc::clone(
            scenarios
                .entry(id.clone())
                .or_insert_with(|| Arc::new(ScenarioMetrics::new(id.clone()))),
        )
    }

    /// Record an already classified outcome
    pub fn record(&self, id: &ScenarioId, outcome: Outcome) {
        self.scenario(id).record(outcome);
    }

    /// Classify a request result, count its status and record it
    pub fn record_response(
        &self,
        id: &ScenarioId,
        result: &Result<Response, EngineError>,
        expected: &str,
        latency: Duration,
    ) -> Outcome {
        let metrics = self.scenario(id);
        if let Ok(response) = result {
            metrics.record_status(response.status());
        }
        let outcome = classify(result, expected, latency);
        metrics.record(outcome);
        outcome
    }

    /// Snapshots of every scenario, ordered by identity
    pub fn snapshot(&self) -> Vec<ScenarioSnapshot> {
        let mut snapshots: Vec<_> = self
            .scenarios
            .read()
            .values()
            .map(|metrics| metrics.snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }
}
