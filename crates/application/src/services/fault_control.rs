//! Fault-injection control plane client
//!
//! Talks to the chaos proxy over its own client engine: `POST /` with a
//! fault command starts a fault, `DELETE /` clears all faults.

use std::sync::Arc;

use domain::{FaultSpec, Response};
use tokio::runtime::Handle;
use tracing::{debug, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{BlockingClientExt, ClientEngine};

/// Path accepting fault commands
pub const CONTROL_PATH: &str = "/";

/// Blocking client for the fault-injection control endpoint
#[derive(Clone)]
pub struct FaultControlPlane {
    engine: Arc<dyn ClientEngine>,
    runtime: Handle,
}

impl std::fmt::Debug for FaultControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultControlPlane").finish_non_exhaustive()
    }
}

impl FaultControlPlane {
    /// Create a control plane client over `engine`
    pub fn new(engine: Arc<dyn ClientEngine>, runtime: Handle) -> Self {
        Self { engine, runtime }
    }

    /// Ask the proxy to start `fault`
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::FaultInjection`] for any status other
    /// than 200 and [`ApplicationError::Engine`] if the request itself fails.
    #[instrument(skip(self, fault), fields(fault = fault.name(), to_port = fault.target_port))]
    pub fn inject(&self, fault: &FaultSpec) -> Result<(), ApplicationError> {
        let body = serde_json::to_string(&fault.command())
            .map_err(|e| ApplicationError::Internal(format!("encode fault command: {e}")))?;

        let response = self.engine.blocking_post(&self.runtime, CONTROL_PATH, &body)?;
        if !response.is_ok() {
            return Err(ApplicationError::FaultInjection {
                status: response.status(),
            });
        }

        debug!("Fault injected");
        Ok(())
    }

    /// Clear every active fault
    ///
    /// The status is not checked; a non-200 answer is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::Engine`] if the request itself fails.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<Response, ApplicationError> {
        let response = self.engine.blocking_delete(&self.runtime, CONTROL_PATH)?;
        if response.is_ok() {
            debug!("Faults reset");
        } else {
            warn!(status = response.status(), "Reset answered with non-200 status");
        }
        Ok(response)
    }

    /// Close the underlying engine
    pub fn close(&self) {
        self.runtime.block_on(self.engine.close());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{EngineError, MockClientEngine};
    use domain::FaultKind;
    use std::time::Duration;

    fn plane(engine: MockClientEngine, runtime: &tokio::runtime::Runtime) -> FaultControlPlane {
        FaultControlPlane::new(Arc::new(engine), runtime.handle().clone())
    }

    #[test]
    fn inject_posts_command_json() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut engine = MockClientEngine::new();
        engine
            .expect_post()
            .withf(|path, body| {
                let json: serde_json::Value = serde_json::from_str(body).unwrap();
                path == "/"
                    && json
                        == serde_json::json!({
                            "name": "service-fail",
                            "type": "SERVICE_FAILURE",
                            "direction": "IN",
                            "to_port": 8080
                        })
            })
            .times(1)
            .returning(|_, _| Ok(Response::new(200, "")));

        let fault = FaultSpec::new(FaultKind::ServiceFailure, 8080, Duration::from_secs(5));
        plane(engine, &runtime).inject(&fault).unwrap();
    }

    #[test]
    fn inject_rejects_non_200() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut engine = MockClientEngine::new();
        engine
            .expect_post()
            .returning(|_, _| Ok(Response::new(409, "already active")));

        let fault = FaultSpec::new(FaultKind::NetworkFailure, 8080, Duration::from_secs(5));
        let err = plane(engine, &runtime).inject(&fault).unwrap_err();
        assert!(matches!(err, ApplicationError::FaultInjection { status: 409 }));
    }

    #[test]
    fn reset_tolerates_non_200() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut engine = MockClientEngine::new();
        engine
            .expect_delete()
            .withf(|path| path == "/")
            .times(1)
            .returning(|_| Ok(Response::new(404, "")));

        let response = plane(engine, &runtime).reset().unwrap();
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn reset_surfaces_engine_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut engine = MockClientEngine::new();
        engine
            .expect_delete()
            .returning(|_| Err(EngineError::Connection("refused".to_string())));

        let err = plane(engine, &runtime).reset().unwrap_err();
        assert!(matches!(err, ApplicationError::Engine(EngineError::Connection(_))));
    }
}
