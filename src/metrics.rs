//! Prometheus recorder setup and the `/metrics` exposition route.
//!
//! All series descriptions live here so the rendered help text covers the
//! whole pipeline even before the first ingestion cycle touches a counter.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder, register all pipeline series, and
    /// expose a static gauge for the configured ingestion interval.
    pub fn init(ingest_interval_secs: u64) -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_series();
        gauge!("ingest_interval_secs").set(ingest_interval_secs as f64);

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

fn describe_series() {
    describe_gauge!("ingest_interval_secs", "Configured scheduler interval.");

    // Source client.
    describe_counter!(
        "client_requests_total",
        "Listing/search requests attempted against the upstream API."
    );
    describe_counter!("client_rate_limited_total", "HTTP 429 responses observed.");
    describe_counter!(
        "circuit_open_total",
        "Calls rejected fast because the circuit was open."
    );
    describe_counter!(
        "client_anon_fallback_total",
        "Requests degraded to the anonymous tier after a failed token exchange."
    );
    describe_counter!("token_exchanges_total", "OAuth client-credentials exchanges.");
    describe_histogram!("client_fetch_ms", "Wall time of one upstream fetch.");

    // Event log.
    describe_counter!("events_emitted_total", "Enrichment events appended to the log.");
    describe_counter!(
        "events_rejected_total",
        "Enrichment events rejected by validation."
    );

    // Orchestrator.
    describe_counter!("ingest_runs_total", "Ingestion cycles started.");
    describe_counter!("ingest_posts_fetched_total", "Posts fetched across all channels.");
    describe_counter!("ingest_posts_deduped_total", "Posts dropped as duplicates.");
    describe_counter!(
        "ingest_search_fallbacks_total",
        "Search requests that fell back to a plain listing fetch."
    );
    describe_histogram!("ingest_run_ms", "Wall time of one ingestion cycle.");
}
