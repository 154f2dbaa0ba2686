use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::{build_aggregates, SnapshotCache};
use crate::events::EnrichmentEventLog;
use crate::orchestrator::{ChannelSpec, IngestOutcome, IngestStats, IngestionOrchestrator};
use crate::scoring::keyword::KeywordScore;
use crate::scoring::rank::{RankedPost, SourceSummary};
use crate::scoring::weights::ScoringWeights;
use crate::scoring::MetricScoringEngine;

#[derive(Clone)]
pub struct AppState {
    log: Arc<EnrichmentEventLog>,
    snapshots: Arc<SnapshotCache>,
    weights: Arc<ScoringWeights>,
    orchestrator: Arc<IngestionOrchestrator>,
    channels: Arc<Vec<ChannelSpec>>,
}

impl AppState {
    pub fn new(
        log: Arc<EnrichmentEventLog>,
        snapshots: Arc<SnapshotCache>,
        weights: Arc<ScoringWeights>,
        orchestrator: Arc<IngestionOrchestrator>,
        channels: Vec<ChannelSpec>,
    ) -> Self {
        Self {
            log,
            snapshots,
            weights,
            orchestrator,
            channels: Arc::new(channels),
        }
    }

    /// Rebuild the scoring engine from the current log + snapshot cache.
    /// Aggregates are a cache, so a fresh fold per query stays correct even
    /// while ingestion keeps appending.
    async fn engine(&self) -> Result<MetricScoringEngine, ApiError> {
        let events = self.log.all().await.map_err(ApiError::log)?;
        let snapshots = self.snapshots.all();
        let set = build_aggregates(&events, &snapshots, current_unix());
        Ok(MetricScoringEngine::with_aggregates(
            (*self.weights).clone(),
            set.keywords,
            set.stories_by_source,
            set.mentions_by_source,
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/scores/keywords", get(scores_get).post(scores_post))
        .route("/rankings/posts", get(rankings_posts))
        .route("/rankings/sources", get(rankings_sources))
        .route("/ingest/run", post(ingest_run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

enum ApiError {
    Internal(String),
}

impl ApiError {
    fn log(e: crate::error::EventLogError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct ScoresQuery {
    /// Comma-separated keyword list.
    keywords: String,
}

#[derive(serde::Deserialize)]
struct ScoresBody {
    keywords: Vec<String>,
}

async fn scores_get(
    State(state): State<AppState>,
    Query(q): Query<ScoresQuery>,
) -> Result<Json<Vec<KeywordScore>>, ApiError> {
    let keywords: Vec<String> = q
        .keywords
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    score(&state, &keywords).await
}

async fn scores_post(
    State(state): State<AppState>,
    Json(body): Json<ScoresBody>,
) -> Result<Json<Vec<KeywordScore>>, ApiError> {
    score(&state, &body.keywords).await
}

async fn score(
    state: &AppState,
    keywords: &[String],
) -> Result<Json<Vec<KeywordScore>>, ApiError> {
    let engine = state.engine().await?;
    if keywords.is_empty() {
        return Ok(Json(engine.metric_scoring_matrix(current_unix())));
    }
    Ok(Json(engine.score_keywords(keywords, current_unix())))
}

async fn rankings_posts(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<RankedPost>>, ApiError> {
    let limit = parse_limit(&q, 25);
    let engine = state.engine().await?;
    let mut ranked = engine.rank_posts(&state.snapshots.posts(), current_unix());
    ranked.truncate(limit);
    Ok(Json(ranked))
}

async fn rankings_sources(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SourceSummary>>, ApiError> {
    let limit = parse_limit(&q, 10);
    let engine = state.engine().await?;
    Ok(Json(engine.top_posts_by_source(&state.snapshots.posts(), current_unix(), limit)))
}

#[derive(serde::Serialize)]
struct IngestResp {
    degraded: bool,
    stats: IngestStats,
}

/// Trigger one ingestion cycle. A throttled cycle answers 503 with a
/// Retry-After header so callers can back off honestly.
async fn ingest_run(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state
        .orchestrator
        .run_once(&state.channels)
        .await
        .map_err(ApiError::log)?
    {
        IngestOutcome::Completed(stats) => Ok(Json(IngestResp {
            degraded: false,
            stats,
        })
        .into_response()),
        IngestOutcome::Degraded {
            stats,
            retry_after_secs,
        } => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(IngestResp {
                degraded: true,
                stats,
            }),
        )
            .into_response()),
    }
}

fn parse_limit(q: &HashMap<String, String>, default: usize) -> usize {
    q.get("limit")
        .and_then(|s| s.parse::<usize>().ok())
        .map(|n| n.clamp(1, 100))
        .unwrap_or(default)
}

fn current_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
