// src/orchestrator.rs
//! # Ingestion Orchestrator
//! Drives one ingestion cycle end to end: fetch (search first, plain
//! listing as fallback), normalize, deduplicate, enrich, append events,
//! refresh the snapshot cache. Scheduling wraps `run_once` in a tokio
//! interval; a cycle is never re-entered concurrently per orchestrator.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::SnapshotCache;
use crate::client::types::{Post, SortMode, TimeWindow};
use crate::client::SourceClient;
use crate::error::{EventLogError, SourceError};
use crate::events::types::{Engagement, EventPayload, NewEvent};
use crate::events::EnrichmentEventLog;
use crate::scoring::rank::PostSnapshot;
use crate::text::{content_hash, normalize_text};

/// Enrichment verdict for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub entities: Vec<String>,
    /// [-1.0, 1.0]
    pub sentiment: f32,
    /// [0.0, 100.0]
    pub quality: f32,
    pub categories: Vec<String>,
}

/// Seam for the enrichment step. The default implementation is a local
/// heuristic; a model-backed one plugs in behind the same trait.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, post: &Post) -> Enrichment;
}

/// Lexicon-and-shape heuristic enrichment. No network, deterministic.
pub struct HeuristicEnricher;

const POSITIVE_WORDS: &[&str] = &[
    "great", "love", "excellent", "amazing", "fast", "stable", "win", "improved", "success",
];
const NEGATIVE_WORDS: &[&str] = &[
    "broken", "slow", "crash", "hate", "terrible", "regression", "fail", "bug", "worst",
];

#[async_trait]
impl Enricher for HeuristicEnricher {
    async fn enrich(&self, post: &Post) -> Enrichment {
        let text = format!("{} {}", post.title, post.selftext);
        let lower = text.to_lowercase();

        let mut score: i32 = 0;
        for w in POSITIVE_WORDS {
            if lower.contains(w) {
                score += 1;
            }
        }
        for w in NEGATIVE_WORDS {
            if lower.contains(w) {
                score -= 1;
            }
        }
        let sentiment = (score as f32 / 3.0).clamp(-1.0, 1.0);

        // Capitalized tokens in the title stand in for entity extraction.
        let mut entities: Vec<String> = Vec::new();
        for token in post.title.split_whitespace() {
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .collect();
            if cleaned.chars().count() >= 3
                && cleaned.chars().next().is_some_and(char::is_uppercase)
                && !entities.iter().any(|e| e.eq_ignore_ascii_case(&cleaned))
            {
                entities.push(cleaned);
            }
        }
        entities.truncate(8);

        // Longer self-text and real discussion read as higher quality.
        let body_len = post.selftext.chars().count().min(2000) as f32;
        let quality = (30.0 + body_len / 40.0 + (post.num_comments.max(0) as f32).min(40.0))
            .clamp(0.0, 100.0);

        Enrichment {
            entities,
            sentiment,
            quality,
            categories: vec!["general".to_string()],
        }
    }
}

/// One channel to ingest per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// When set, search for this query within the channel; a plain listing
    /// fetch is the fallback.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub fetched: u64,
    pub kept: u64,
    pub deduped: u64,
    pub events_emitted: u64,
    pub used_search_fallback: bool,
}

/// Result of one cycle. Degraded means the source throttled or the circuit
/// opened mid-run; whatever was ingested before that point stays ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Completed(IngestStats),
    Degraded {
        stats: IngestStats,
        retry_after_secs: u64,
    },
}

impl IngestOutcome {
    pub fn stats(&self) -> &IngestStats {
        match self {
            IngestOutcome::Completed(s) => s,
            IngestOutcome::Degraded { stats, .. } => stats,
        }
    }
}

pub struct IngestionOrchestrator {
    client: Arc<SourceClient>,
    log: Arc<EnrichmentEventLog>,
    enricher: Arc<dyn Enricher>,
    snapshots: Arc<SnapshotCache>,
    session_id: String,
    seen_hashes: Mutex<HashSet<String>>,
}

impl IngestionOrchestrator {
    pub fn new(
        client: Arc<SourceClient>,
        log: Arc<EnrichmentEventLog>,
        enricher: Arc<dyn Enricher>,
        snapshots: Arc<SnapshotCache>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            log,
            enricher,
            snapshots,
            session_id: session_id.into(),
            seen_hashes: Mutex::new(HashSet::new()),
        }
    }

    /// One full ingestion cycle over the given channels, sequentially. A
    /// throttle (rate limit or open circuit) ends the cycle early rather
    /// than hammering the same quota from the next channel.
    pub async fn run_once(&self, channels: &[ChannelSpec]) -> Result<IngestOutcome, EventLogError> {
        counter!("ingest_runs_total").increment(1);
        let started = Instant::now();
        let mut stats = IngestStats::default();

        for channel in channels {
            match self.fetch_channel(channel, &mut stats).await {
                Ok(posts) => {
                    let emitted = self.ingest_posts(channel, posts, &mut stats).await?;
                    stats.events_emitted += emitted;
                }
                Err(e) if e.is_transient() => {
                    let retry_after_secs = e.retry_after_secs().unwrap_or(60);
                    warn!(
                        channel = %channel.name,
                        retry_after_secs,
                        error = %e,
                        "source throttled, ending cycle early"
                    );
                    histogram!("ingest_run_ms").record(started.elapsed().as_millis() as f64);
                    return Ok(IngestOutcome::Degraded {
                        stats,
                        retry_after_secs,
                    });
                }
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "channel fetch failed, skipping");
                }
            }
        }

        histogram!("ingest_run_ms").record(started.elapsed().as_millis() as f64);
        info!(
            fetched = stats.fetched,
            kept = stats.kept,
            deduped = stats.deduped,
            events = stats.events_emitted,
            "ingestion cycle complete"
        );
        Ok(IngestOutcome::Completed(stats))
    }

    /// Search when the channel carries a query, falling back to a plain
    /// listing on non-transient search failure. Transient errors propagate:
    /// retrying the same quota with a different endpoint helps nobody.
    async fn fetch_channel(
        &self,
        channel: &ChannelSpec,
        stats: &mut IngestStats,
    ) -> Result<Vec<Post>, SourceError> {
        let window = channel.time_window.unwrap_or(TimeWindow::Day);
        let page = match &channel.query {
            Some(q) => {
                match self
                    .client
                    .search_posts(q, &channel.name, channel.sort, window, channel.limit)
                    .await
                {
                    Ok(page) => page,
                    Err(e) if e.is_transient() => return Err(e),
                    Err(e) => {
                        warn!(
                            channel = %channel.name,
                            error = %e,
                            "search failed, falling back to listing fetch"
                        );
                        counter!("ingest_search_fallbacks_total").increment(1);
                        stats.used_search_fallback = true;
                        self.client
                            .fetch_posts(&channel.name, channel.sort, channel.limit, Some(window), None)
                            .await?
                    }
                }
            }
            None => {
                self.client
                    .fetch_posts(&channel.name, channel.sort, channel.limit, Some(window), None)
                    .await?
            }
        };
        stats.fetched += page.items.len() as u64;
        counter!("ingest_posts_fetched_total").increment(page.items.len() as u64);
        Ok(page.items)
    }

    /// Normalize, dedupe, enrich and append events for one channel's posts.
    async fn ingest_posts(
        &self,
        channel: &ChannelSpec,
        posts: Vec<Post>,
        stats: &mut IngestStats,
    ) -> Result<u64, EventLogError> {
        let mut batch: Vec<NewEvent> = Vec::new();

        for post in posts {
            let normalized = normalize_text(&format!("{} {}", post.title, post.selftext));
            let hash = content_hash(&normalized);
            {
                let mut seen = self.seen_hashes.lock().expect("dedup set mutex poisoned");
                if !seen.insert(hash) {
                    stats.deduped += 1;
                    counter!("ingest_posts_deduped_total").increment(1);
                    debug!(post_id = %post.id, "duplicate content, skipped");
                    continue;
                }
            }
            stats.kept += 1;

            let enrichment = self.enricher.enrich(&post).await;
            self.snapshots.upsert(PostSnapshot {
                id: post.id.clone(),
                title: post.title.clone(),
                source: post.subreddit.clone(),
                created_at: post.created_at(),
                quality: f64::from(enrichment.quality),
                sentiment: enrichment.sentiment,
                engagement: Engagement {
                    upvotes: post.ups,
                    comments: post.num_comments,
                    shares: 0,
                },
            });

            batch.push(NewEvent::new(
                &post.id,
                &self.session_id,
                EventPayload::PostEnriched {
                    subreddit: Some(post.subreddit.clone()),
                    entities: enrichment.entities,
                    sentiment: enrichment.sentiment,
                    quality: enrichment.quality,
                    categories: enrichment.categories,
                    thread_id: None,
                    is_cross_post: post.is_cross_post(),
                },
            ));
            batch.push(NewEvent::new(
                &post.id,
                &self.session_id,
                EventPayload::EngagementUpdated {
                    engagement: Engagement {
                        upvotes: post.ups,
                        comments: post.num_comments,
                        shares: 0,
                    },
                },
            ));
        }

        if batch.is_empty() {
            return Ok(0);
        }
        let count = batch.len() as u64;
        self.log.emit_batch(batch).await?;
        debug!(channel = %channel.name, events = count, "channel batch appended");
        Ok(count)
    }
}

/// Periodic driver around [`IngestionOrchestrator::run_once`]. Cycles run
/// back to back on one task, so a slow cycle delays the next rather than
/// overlapping it.
pub fn spawn_scheduler(
    orchestrator: Arc<IngestionOrchestrator>,
    channels: Vec<ChannelSpec>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match orchestrator.run_once(&channels).await {
                Ok(IngestOutcome::Completed(stats)) => {
                    debug!(kept = stats.kept, "scheduled cycle finished");
                }
                Ok(IngestOutcome::Degraded {
                    retry_after_secs, ..
                }) => {
                    warn!(retry_after_secs, "scheduled cycle degraded, waiting out throttle");
                    tokio::time::sleep(std::time::Duration::from_secs(retry_after_secs)).await;
                }
                Err(e) => {
                    warn!(error = %e, "scheduled cycle failed to append events");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, title: &str, selftext: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            selftext: selftext.into(),
            subreddit: "rust".into(),
            author: Some("u1".into()),
            ups: 10,
            num_comments: 5,
            created_utc: 1_700_000_000.0,
            permalink: None,
            crosspost_parent: None,
        }
    }

    #[tokio::test]
    async fn heuristic_enricher_extracts_capitalized_entities() {
        let p = post("p1", "Tokio scheduler is amazing in Rust", "");
        let e = HeuristicEnricher.enrich(&p).await;
        assert!(e.entities.contains(&"Tokio".to_string()));
        assert!(e.entities.contains(&"Rust".to_string()));
        assert!(e.sentiment > 0.0);
    }

    #[tokio::test]
    async fn heuristic_enricher_negative_lexicon_pulls_sentiment_down() {
        let p = post("p1", "Constant crash and regression, terrible", "");
        let e = HeuristicEnricher.enrich(&p).await;
        assert!(e.sentiment < 0.0);
    }

    #[tokio::test]
    async fn heuristic_quality_stays_in_range() {
        let long_body = "x".repeat(10_000);
        let p = post("p1", "Title", &long_body);
        let e = HeuristicEnricher.enrich(&p).await;
        assert!((0.0..=100.0).contains(&e.quality));
    }
}
