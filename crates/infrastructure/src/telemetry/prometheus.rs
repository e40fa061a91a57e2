//! Prometheus exporter for the `metrics` facade

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use super::TelemetryError;
use crate::config::MetricsConfig;

/// Install the global Prometheus recorder
///
/// With `prometheus_listen` set the scrape endpoint is spawned on the
/// current Tokio runtime, so call this inside `Runtime::enter`. The handle
/// renders the exposition text on demand either way.
pub fn install_prometheus(config: &MetricsConfig) -> Result<PrometheusHandle, TelemetryError> {
    let builder = PrometheusBuilder::new();

    let Some(addr) = config.prometheus_listen else {
        return builder
            .install_recorder()
            .map_err(|e| TelemetryError::Metrics(e.to_string()));
    };

    let (recorder, exporter) = builder
        .with_http_listener(addr)
        .build()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| TelemetryError::Metrics(e.to_string()))?;
    tokio::spawn(exporter);

    info!(%addr, "Prometheus exporter listening");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use application::{ERRORS_METRIC, LATENCY_METRIC, MetricsRegistry, RESPONSES_METRIC};
    use domain::{Response, ScenarioId};

    #[test]
    fn registry_records_reach_the_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let registry = MetricsRegistry::new();
        let id = ScenarioId::new("chaos.test", "normal");

        metrics::with_local_recorder(&recorder, || {
            let ok = Ok(Response::new(200, "hello"));
            let down = Ok(Response::new(503, "down"));
            registry.record_response(&id, &ok, "hello", Duration::from_millis(5));
            registry.record_response(&id, &down, "hello", Duration::from_millis(5));
        });

        let rendered = handle.render();
        assert!(rendered.contains(LATENCY_METRIC), "{rendered}");
        assert!(rendered.contains(ERRORS_METRIC), "{rendered}");
        assert!(rendered.contains(RESPONSES_METRIC), "{rendered}");
        assert!(rendered.contains(r#"status="503""#), "{rendered}");
        assert!(rendered.contains(r#"kind="transport""#), "{rendered}");
        assert!(rendered.contains(r#"scenario="chaos.test.normal""#), "{rendered}");
    }

    #[test]
    fn global_recorder_installs_once() {
        let config = MetricsConfig::default();
        let handle = install_prometheus(&config).unwrap();

        metrics::counter!(ERRORS_METRIC, "kind" => "transport").increment(1);
        assert!(handle.render().contains(ERRORS_METRIC));

        assert!(matches!(
            install_prometheus(&config),
            Err(TelemetryError::Metrics(_))
        ));
    }
}
