// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /scores/keywords (neutral row for unknown keywords)
// - POST /ingest/run (200 with stats; 503 + Retry-After when throttled)
// - GET /rankings/posts after an ingest cycle

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use trendpulse::aggregate::SnapshotCache;
use trendpulse::api::{create_router, AppState};
use trendpulse::client::types::SortMode;
use trendpulse::client::{ClientConfig, HttpRequest, HttpResponse, SourceClient, Transport};
use trendpulse::error::SourceError;
use trendpulse::events::EnrichmentEventLog;
use trendpulse::orchestrator::{ChannelSpec, HeuristicEnricher, IngestionOrchestrator};
use trendpulse::scoring::weights::ScoringWeights;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct CannedTransport {
    status: u16,
    body: String,
    retry_after_secs: Option<u64>,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn execute(&self, _req: HttpRequest) -> Result<HttpResponse, SourceError> {
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
            retry_after_secs: self.retry_after_secs,
        })
    }
}

fn listing_with_one_post() -> String {
    json!({"data": {"after": null, "before": null, "children": [
        {"data": {
            "id": "p1",
            "title": "Tokio scheduler improvements",
            "selftext": "Great release",
            "subreddit": "rust",
            "ups": 120,
            "num_comments": 7,
            "created_utc": 1_700_000_000.0
        }}
    ]}})
    .to_string()
}

/// Build the same Router the binary uses, backed by a canned transport.
fn test_router(transport: CannedTransport) -> Router {
    let client = Arc::new(SourceClient::new(
        ClientConfig::default(),
        Arc::new(transport) as Arc<dyn Transport>,
        None,
    ));
    let log = Arc::new(EnrichmentEventLog::in_memory());
    let snapshots = Arc::new(SnapshotCache::new());
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        client,
        Arc::clone(&log),
        Arc::new(HeuristicEnricher),
        Arc::clone(&snapshots),
        "sess-api",
    ));
    let channels = vec![ChannelSpec {
        name: "rust".into(),
        sort: SortMode::Hot,
        limit: 25,
        query: None,
        time_window: None,
    }];
    let state = AppState::new(
        log,
        snapshots,
        Arc::new(ScoringWeights::default()),
        orchestrator,
        channels,
    );
    create_router(state)
}

fn healthy_router() -> Router {
    test_router(CannedTransport {
        status: 200,
        body: listing_with_one_post(),
        retry_after_secs: None,
    })
}

async fn read_json(resp: shuttle_axum::axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = healthy_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok");
}

#[tokio::test]
async fn api_scores_returns_neutral_row_for_unknown_keyword() {
    let app = healthy_router();

    let payload = json!({ "keywords": ["nonexistent"] });
    let req = Request::builder()
        .method("POST")
        .uri("/scores/keywords")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /scores/keywords");

    let resp = app.oneshot(req).await.expect("oneshot /scores/keywords");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let rows = v.as_array().expect("array of score rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["keyword"], "nonexistent");
    assert_eq!(rows[0]["overall"], 50.0);
    assert_eq!(rows[0]["trend_status"], "stable");
}

#[tokio::test]
async fn api_ingest_then_rankings_roundtrip() {
    let app = healthy_router();

    let req = Request::builder()
        .method("POST")
        .uri("/ingest/run")
        .body(Body::empty())
        .expect("build POST /ingest/run");
    let resp = app.clone().oneshot(req).await.expect("oneshot /ingest/run");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["degraded"], false);
    assert_eq!(v["stats"]["kept"], 1);

    let req = Request::builder()
        .method("GET")
        .uri("/rankings/posts?limit=5")
        .body(Body::empty())
        .expect("build GET /rankings/posts");
    let resp = app.oneshot(req).await.expect("oneshot /rankings/posts");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    let rows = v.as_array().expect("array of ranked posts");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["post_id"], "p1");
    assert_eq!(rows[0]["source"], "rust");
}

#[tokio::test]
async fn api_ingest_answers_503_with_retry_after_when_throttled() {
    let app = test_router(CannedTransport {
        status: 429,
        body: String::new(),
        retry_after_secs: Some(120),
    });

    let req = Request::builder()
        .method("POST")
        .uri("/ingest/run")
        .body(Body::empty())
        .expect("build POST /ingest/run");
    let resp = app.oneshot(req).await.expect("oneshot /ingest/run");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        resp.headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok()),
        Some("120")
    );

    let v = read_json(resp).await;
    assert_eq!(v["degraded"], true);
}
