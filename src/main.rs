//! Trend Pulse binary entrypoint.
//! Boots the Axum HTTP server, wiring the source client, event log,
//! orchestrator, scheduler, and metrics exporter.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trendpulse::aggregate::SnapshotCache;
use trendpulse::api::{create_router, AppState};
use trendpulse::client::{ReqwestTransport, SourceClient};
use trendpulse::config::{credential_from_env, PipelineConfig};
use trendpulse::events::EnrichmentEventLog;
use trendpulse::metrics::Metrics;
use trendpulse::orchestrator::{spawn_scheduler, HeuristicEnricher, IngestionOrchestrator};
use trendpulse::scoring::weights::ScoringWeights;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - TRENDPULSE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("TRENDPULSE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trendpulse=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This is how
    // SOURCE_CLIENT_ID / SOURCE_CLIENT_SECRET and TRENDPULSE_CONFIG_PATH
    // reach the process locally.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let pipeline = PipelineConfig::load_default();
    let weights = Arc::new(ScoringWeights::load_default());

    let metrics = Metrics::init(pipeline.scheduler.interval_secs);

    // --- Source client ---
    let transport = Arc::new(ReqwestTransport::new(
        &pipeline.client.user_agent,
        Duration::from_secs(pipeline.client.request_timeout_secs),
    ));
    let client = Arc::new(SourceClient::new(
        pipeline.client_config(),
        transport,
        credential_from_env(),
    ));

    // --- Event log + derived caches ---
    let log = Arc::new(EnrichmentEventLog::in_memory());
    let snapshots = Arc::new(SnapshotCache::new());

    let session_id = format!("session-{}", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"));
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        client,
        Arc::clone(&log),
        Arc::new(HeuristicEnricher),
        Arc::clone(&snapshots),
        session_id,
    ));

    if pipeline.scheduler.enabled && !pipeline.channels.is_empty() {
        let _scheduler = spawn_scheduler(
            Arc::clone(&orchestrator),
            pipeline.channels.clone(),
            pipeline.scheduler.interval_secs,
        );
    }

    let state = AppState::new(log, snapshots, weights, orchestrator, pipeline.channels);
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
