//! Integration tests for the infrastructure crate
//!
//! Tests cover:
//! - reqwest engine against a wiremock target
//! - Fault control plane commands and chaos cycles
//! - End-to-end exercises recording metrics
//! - Pooled connections closed by the server while idle

use std::sync::Arc;
use std::time::Duration;

use application::ports::{BlockingClientExt, ClientEngine, ClientEngineFactory, EngineError};
use application::{
    ApplicationError, ChaosExercise, ChaosScheduler, ChaosSuite, ChaosSuiteConfig, ExerciseConfig,
    FaultControlPlane, MetricsRegistry, PerformanceConfig, PerformanceMode, PerformanceSuite,
    Workload,
};
use domain::payloads::{LONG, LONG_PATH, SHORT, SHORT_PATH};
use domain::{ChaosState, FaultKind, FaultSpec, Scenario, ScenarioId};
use infrastructure::{ReqwestEngine, ReqwestEngineConfig, ReqwestEngineFactory};
use tokio::runtime::Handle;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_for(server: &MockServer) -> Arc<dyn ClientEngine> {
    let address = server.address();
    ReqwestEngineFactory::default()
        .create_client(&address.ip().to_string(), address.port())
        .unwrap()
}

async fn mount_target(server: &MockServer) {
    Mock::given(path(SHORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHORT))
        .mount(server)
        .await;
    Mock::given(path(LONG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(LONG))
        .mount(server)
        .await;
}

async fn count_requests(server: &MockServer, verb: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.method.as_str() == verb)
        .count()
}

// ============================================================================
// Engine Tests
// ============================================================================

mod engine_tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let server = MockServer::start().await;
        mount_target(&server).await;

        let engine = engine_for(&server);
        let response = engine.get(SHORT_PATH).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), SHORT);
    }

    #[tokio::test]
    async fn post_sends_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LONG_PATH))
            .and(header("content-type", "application/json"))
            .and(body_string(SHORT))
            .respond_with(ResponseTemplate::new(200).set_body_string(LONG))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let body = engine.post_body(LONG_PATH, SHORT).await.unwrap();

        assert_eq!(body, LONG);
    }

    #[tokio::test]
    async fn non_200_is_returned_as_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let response = engine.get(SHORT_PATH).await.unwrap();
        assert_eq!(response.status(), 503);

        let err = engine.get_body(SHORT_PATH).await.unwrap_err();
        assert_eq!(err, EngineError::UnexpectedStatus(503));
    }

    #[tokio::test]
    async fn delete_hits_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        assert!(engine.delete("/").await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn read_timeout_maps_to_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(SHORT)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let address = server.address();
        let config = ReqwestEngineConfig::default().with_read_timeout(Duration::from_millis(200));
        let engine = ReqwestEngine::new(&config, &address.ip().to_string(), address.port()).unwrap();

        let err = engine.get(SHORT_PATH).await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn closed_engine_sends_nothing() {
        let server = MockServer::start().await;
        mount_target(&server).await;

        let engine = engine_for(&server);
        engine.close().await;

        assert_eq!(engine.get(SHORT_PATH).await, Err(EngineError::Closed));
        assert_eq!(count_requests(&server, "GET").await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_wrappers_work_off_the_runtime() {
        let server = MockServer::start().await;
        mount_target(&server).await;

        let engine = engine_for(&server);
        let runtime = Handle::current();
        let body = tokio::task::spawn_blocking(move || {
            engine.blocking_post_body(&runtime, SHORT_PATH, SHORT)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(body, SHORT);
    }
}

// ============================================================================
// Fault Control Plane Tests
// ============================================================================

mod control_plane_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn inject_posts_fault_command() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "name": "net-fail",
                "type": "NETWORK_FAILURE",
                "direction": "IN",
                "to_port": 8080
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let control = FaultControlPlane::new(engine_for(&server), Handle::current());
        let fault = FaultSpec::new(FaultKind::NetworkFailure, 8080, Duration::from_secs(5));

        let result = tokio::task::spawn_blocking(move || control.inject(&fault))
            .await
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejected_injection_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let control = FaultControlPlane::new(engine_for(&server), Handle::current());
        let fault = FaultSpec::new(FaultKind::ServiceFailure, 8080, Duration::from_secs(5));

        let err = tokio::task::spawn_blocking(move || control.inject(&fault))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ApplicationError::FaultInjection { status: 500 }));
        assert_eq!(
            err.to_string(),
            "Failed to inject chaos. Expected 200, got 500."
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scheduler_cycle_injects_then_resets() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let control = FaultControlPlane::new(engine_for(&server), Handle::current());
        let fault = FaultSpec::new(FaultKind::ServiceFailure, 8080, Duration::from_millis(50));

        let scheduler = tokio::task::spawn_blocking(move || {
            let scheduler = ChaosScheduler::new(control, fault, Duration::from_secs(10)).unwrap();
            scheduler.cycle().unwrap();
            scheduler
        })
        .await
        .unwrap();

        assert_eq!(scheduler.state(), ChaosState::Idle);
        let stats = scheduler.stats();
        assert_eq!(stats.injections, 1);
        assert_eq!(stats.resets, 1);
        assert_eq!(count_requests(&server, "POST").await, 1);
        assert_eq!(count_requests(&server, "DELETE").await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scheduler_around_always_finishes_with_reset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let control = FaultControlPlane::new(engine_for(&server), Handle::current());
        let fault = FaultSpec::new(FaultKind::NetworkFailure, 8080, Duration::from_millis(50));

        tokio::task::spawn_blocking(move || {
            let scheduler =
                ChaosScheduler::new(control, fault, Duration::from_millis(100)).unwrap();
            scheduler
                .around(|| {
                    std::thread::sleep(Duration::from_millis(350));
                    Ok::<_, ApplicationError>(())
                })
                .unwrap();
            assert_eq!(scheduler.state(), ChaosState::Idle);
        })
        .await
        .unwrap();

        let posts = count_requests(&server, "POST").await;
        let deletes = count_requests(&server, "DELETE").await;
        assert!(posts >= 1, "no injections");
        assert_eq!(deletes, posts + 1);
    }
}

// ============================================================================
// Exercise Tests
// ============================================================================

mod exercise_tests {
    use super::*;

    fn short_chaos_config() -> ChaosSuiteConfig {
        ChaosSuiteConfig {
            exercise: ExerciseConfig {
                workers: 2,
                rate_per_second: 20.0,
            },
            duration: Duration::from_secs(1),
            warm_up: Duration::from_millis(200),
            hold: Duration::from_millis(100),
            interval: Duration::from_millis(400),
            target_port: 8080,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn normal_exercise_records_successes() {
        let target = MockServer::start().await;
        mount_target(&target).await;
        let control = MockServer::start().await;

        let metrics = Arc::new(MetricsRegistry::new());
        let workload = Workload::new(
            engine_for(&target),
            Handle::current(),
            Arc::clone(&metrics),
            Scenario::ShortGet,
        );
        let control = FaultControlPlane::new(engine_for(&control), Handle::current());

        let results = tokio::task::spawn_blocking(move || {
            let suite = ChaosSuite::new(workload, control, short_chaos_config())?;
            suite.run(&[ChaosExercise::Normal])
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(results.len(), 1);
        let (exercise, summary) = &results[0];
        assert_eq!(*exercise, ChaosExercise::Normal);
        assert!(summary.executions >= 10, "only {} executions", summary.executions);
        assert_eq!(summary.failures, 0);

        let id = ScenarioId::new("chaos.reqwest", "normal");
        let snapshot = metrics
            .snapshot()
            .into_iter()
            .find(|snapshot| snapshot.id == id)
            .unwrap();
        assert_eq!(snapshot.timer.count, summary.executions);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.app_errors, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wrong_body_counts_as_error_and_mismatch() {
        let target = MockServer::start().await;
        Mock::given(path(SHORT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not it"))
            .mount(&target)
            .await;

        let metrics = Arc::new(MetricsRegistry::new());
        let workload = Workload::new(
            engine_for(&target),
            Handle::current(),
            Arc::clone(&metrics),
            Scenario::ShortGet,
        );
        let id = ScenarioId::new("chaos.reqwest", "normal");

        let outcome = tokio::task::spawn_blocking({
            let id = id.clone();
            move || workload.dispatch_and_wait(id)
        })
        .await
        .unwrap();

        assert!(outcome.is_app_error());
        let snapshot = metrics.scenario(&id).snapshot();
        assert_eq!(snapshot.app_errors, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.timer.count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn blocking_performance_batch_runs_every_execution() {
        let target = MockServer::start().await;
        mount_target(&target).await;

        let metrics = Arc::new(MetricsRegistry::new());
        let workload = Workload::new(
            engine_for(&target),
            Handle::current(),
            Arc::clone(&metrics),
            Scenario::LongLongPost,
        );
        let config = PerformanceConfig {
            executions: 40,
            workers: 4,
            non_blocking_executions: 10,
            max_pool_size: 5,
        };

        let runs = tokio::task::spawn_blocking(move || {
            PerformanceSuite::new(workload, config).run(&[PerformanceMode::BlockingSync])
        })
        .await
        .unwrap()
        .unwrap();

        let run = runs
            .iter()
            .find(|run| run.id.method().starts_with("blocking_sync"))
            .unwrap();
        assert_eq!(run.executions, 40);

        let snapshot = metrics
            .snapshot()
            .into_iter()
            .find(|snapshot| snapshot.id == run.id)
            .unwrap();
        assert_eq!(snapshot.timer.count, 40);
        assert_eq!(snapshot.errors, 0);
    }
}

// ============================================================================
// Connection Reuse Tests
// ============================================================================

mod keep_alive_tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const KEEP_ALIVE: Duration = Duration::from_secs(1);

    async fn serve(mut stream: TcpStream) {
        let mut buf = vec![0_u8; 4096];
        loop {
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match tokio::time::timeout(KEEP_ALIVE, stream.read(&mut buf)).await {
                    Ok(Ok(n)) if n > 0 => request.extend_from_slice(&buf[..n]),
                    _ => return,
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n{SHORT}",
                SHORT.len()
            );
            if stream.write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    #[tokio::test]
    async fn connection_closed_while_idle_is_replaced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream));
            }
        });

        let engine = ReqwestEngine::new(&ReqwestEngineConfig::default(), "127.0.0.1", port).unwrap();

        assert_eq!(engine.get_body(SHORT_PATH).await.unwrap(), SHORT);
        tokio::time::sleep(KEEP_ALIVE + Duration::from_millis(500)).await;
        assert_eq!(engine.get_body(SHORT_PATH).await.unwrap(), SHORT);
    }
}
