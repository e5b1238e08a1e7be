// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder, register series descriptions,
    /// and expose a static gauge with the number of configured providers.
    pub fn init(configured_providers: usize) -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!("provider_calls_total", "Live provider calls issued.");
        describe_counter!("provider_errors_total", "Provider calls that failed.");
        describe_counter!(
            "provider_mock_fallbacks_total",
            "Calls answered by the offline generator."
        );
        describe_counter!("turns_completed_total", "Turns that completed with data.");
        describe_counter!(
            "turns_failed_total",
            "Turns completed through the failure path."
        );
        describe_counter!("turns_rejected_total", "Prompts rejected by validation.");
        describe_histogram!(
            "provider_response_seconds",
            "Per-provider wall-clock response time."
        );

        gauge!("providers_configured").set(configured_providers as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
