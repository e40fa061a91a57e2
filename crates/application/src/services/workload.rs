//! Workload dispatch
//!
//! Binds a client engine, a runtime and a scenario, and turns each task
//! invocation into one measured request.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::{Outcome, Response, Scenario, ScenarioId};
use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::warn;

use super::task_runner::panic_message;
use super::{CompletionGuard, MetricsRegistry};
use crate::error::ApplicationError;
use crate::ports::{BlockingClientExt, ClientEngine, EngineError};

/// One scenario driven through one engine
#[derive(Clone)]
pub struct Workload {
    engine: Arc<dyn ClientEngine>,
    runtime: Handle,
    metrics: Arc<MetricsRegistry>,
    scenario: Scenario,
}

impl std::fmt::Debug for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workload")
            .field("engine", &self.engine.name())
            .field("scenario", &self.scenario)
            .finish_non_exhaustive()
    }
}

impl Workload {
    /// Create a workload
    pub fn new(
        engine: Arc<dyn ClientEngine>,
        runtime: Handle,
        metrics: Arc<MetricsRegistry>,
        scenario: Scenario,
    ) -> Self {
        Self {
            engine,
            runtime,
            metrics,
            scenario,
        }
    }

    /// Same engine and metrics, different scenario
    #[must_use]
    pub fn with_scenario(&self, scenario: Scenario) -> Self {
        Self {
            scenario,
            ..self.clone()
        }
    }

    /// Scenario being driven
    pub const fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Engine under test
    pub fn engine(&self) -> &Arc<dyn ClientEngine> {
        &self.engine
    }

    /// Registry receiving the outcomes
    pub const fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Send the request on the runtime without waiting
    ///
    /// The outcome is recorded under `id` and `guard` is dropped once the
    /// request has finished, whichever runtime thread that happens on.
    pub fn dispatch(&self, id: ScenarioId, guard: CompletionGuard) {
        let request = self.measured(id);
        self.runtime.spawn(async move {
            request.await;
            drop(guard);
        });
    }

    /// Send the request on the runtime and block until it is recorded
    ///
    /// A request task cancelled before it ran, e.g. by runtime shutdown, is
    /// recorded as [`EngineError::Aborted`]. Must not be called from inside
    /// an async task.
    pub fn dispatch_and_wait(&self, id: ScenarioId) -> Outcome {
        let handle = self.runtime.spawn(self.measured(id.clone()));
        match self.runtime.block_on(handle) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(scenario = %id, error = %e, "Request task aborted");
                let aborted = Err(EngineError::Aborted(e.to_string()));
                self.metrics
                    .record_response(&id, &aborted, self.scenario.expected_body(), Duration::ZERO)
            },
        }
    }

    /// Send the request through the blocking wrappers on the calling thread
    pub fn execute_blocking(&self, id: &ScenarioId) -> Outcome {
        let started = Instant::now();
        let result = match self.scenario.request_body() {
            Some(body) => self
                .engine
                .blocking_post(&self.runtime, self.scenario.path(), body),
            None => self.engine.blocking_get(&self.runtime, self.scenario.path()),
        };
        self.metrics
            .record_response(id, &result, self.scenario.expected_body(), started.elapsed())
    }

    /// Exercise task dispatching one request per invocation
    pub fn exercise_task(
        &self,
        id: ScenarioId,
    ) -> impl Fn(CompletionGuard) -> Result<(), ApplicationError> + Send + Sync + 'static {
        let workload = self.clone();
        move |guard| {
            workload.dispatch(id.clone(), guard);
            Ok(())
        }
    }

    fn measured(&self, id: ScenarioId) -> impl Future<Output = Outcome> + Send + 'static {
        let engine = Arc::clone(&self.engine);
        let metrics = Arc::clone(&self.metrics);
        let scenario = self.scenario;

        async move {
            let started = Instant::now();
            match AssertUnwindSafe(send(engine.as_ref(), scenario))
                .catch_unwind()
                .await
            {
                Ok(result) => {
                    metrics.record_response(&id, &result, scenario.expected_body(), started.elapsed())
                },
                Err(payload) => {
                    warn!(
                        scenario = %id,
                        panic = %panic_message(payload.as_ref()),
                        "Response handling panicked"
                    );
                    metrics.record(&id, Outcome::TransportFailure);
                    Outcome::TransportFailure
                },
            }
        }
    }
}

async fn send(engine: &dyn ClientEngine, scenario: Scenario) -> Result<Response, EngineError> {
    match scenario.request_body() {
        Some(body) => engine.post(scenario.path(), body).await,
        None => engine.get(scenario.path()).await,
    }
}
