// src/aggregate.rs
//! Derived rollups: fold the enrichment event log plus raw post snapshots
//! into per-keyword aggregates and per-source counts.
//!
//! Everything produced here is a cache, rebuilt from the log on demand.
//! Discarding it loses nothing.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::events::types::{EnrichmentEvent, EventPayload};
use crate::scoring::keyword::{
    KeywordAggregate, KeywordType, SentimentLabel, SourceBreakdown, TrendStatus,
};
use crate::scoring::rank::PostSnapshot;

/// Baseline engagement growth (score units per hour) that the viral
/// coefficient is expressed relative to.
const VIRAL_BASELINE_PER_HOUR: f64 = 10.0;

/// Sentiment values within this band of zero count as neutral.
const NEUTRAL_SENTIMENT_BAND: f32 = 0.15;

const SIX_HOURS: u64 = 6 * 3600;
const DAY: u64 = 24 * 3600;
const SEVENTY_TWO_HOURS: u64 = 72 * 3600;

/// Latest raw post state per id, updated at enrichment time.
#[derive(Default)]
pub struct SnapshotCache {
    inner: Mutex<HashMap<String, PostSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, snapshot: PostSnapshot) {
        let mut g = self.inner.lock().expect("snapshot cache mutex poisoned");
        g.insert(snapshot.id.clone(), snapshot);
    }

    pub fn all(&self) -> HashMap<String, PostSnapshot> {
        self.inner
            .lock()
            .expect("snapshot cache mutex poisoned")
            .clone()
    }

    pub fn posts(&self) -> Vec<PostSnapshot> {
        self.inner
            .lock()
            .expect("snapshot cache mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("snapshot cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct AggregateSet {
    pub keywords: HashMap<String, KeywordAggregate>,
    pub stories_by_source: HashMap<String, u64>,
    pub mentions_by_source: HashMap<String, u64>,
}

#[derive(Default)]
struct KeywordAcc {
    display: String,
    occurrences: u64,
    recent_occurrences: u64,
    mid_occurrences: u64,
    engagement_total: f64,
    first_seen: u64,
    last_seen: u64,
    positive: u64,
    negative: u64,
    neutral: u64,
    categories: HashMap<String, u64>,
    sources: HashMap<String, (f64, u64)>,
}

/// Fold events into keyword/source aggregates. The log's storage order is
/// not temporal, so events are sorted by `at` before folding.
pub fn build_aggregates(
    events: &[EnrichmentEvent],
    snapshots: &HashMap<String, PostSnapshot>,
    now: u64,
) -> AggregateSet {
    let mut ordered: Vec<&EnrichmentEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.at, e.id));

    let mut accs: HashMap<String, KeywordAcc> = HashMap::new();
    let mut keywords_by_post: HashMap<&str, Vec<String>> = HashMap::new();
    let mut engagement_by_post: HashMap<&str, f64> = HashMap::new();
    let mut stories_by_source: HashMap<String, u64> = HashMap::new();
    let mut mentions_by_source: HashMap<String, u64> = HashMap::new();

    for ev in ordered {
        match &ev.payload {
            EventPayload::PostEnriched {
                subreddit,
                entities,
                sentiment,
                quality,
                categories,
                ..
            } => {
                let source = subreddit
                    .clone()
                    .or_else(|| snapshots.get(&ev.post_id).map(|s| s.source.clone()));
                for entity in entities {
                    let key = entity.trim().to_lowercase();
                    if key.is_empty() {
                        continue;
                    }
                    keywords_by_post
                        .entry(ev.post_id.as_str())
                        .or_default()
                        .push(key.clone());

                    let acc = accs.entry(key).or_default();
                    if acc.display.is_empty() {
                        acc.display = entity.trim().to_string();
                    }
                    acc.occurrences += 1;
                    let age = now.saturating_sub(ev.at);
                    if age < SIX_HOURS {
                        acc.recent_occurrences += 1;
                    } else if age < DAY {
                        acc.mid_occurrences += 1;
                    }
                    if acc.first_seen == 0 || ev.at < acc.first_seen {
                        acc.first_seen = ev.at;
                    }
                    acc.last_seen = acc.last_seen.max(ev.at);
                    tally_sentiment(acc, *sentiment);
                    for cat in categories {
                        *acc.categories.entry(cat.to_lowercase()).or_insert(0) += 1;
                    }
                    if let Some(src) = &source {
                        let s = acc.sources.entry(src.clone()).or_insert((0.0, 0));
                        s.0 += f64::from(*quality);
                        s.1 += 1;
                        *mentions_by_source.entry(src.clone()).or_insert(0) += 1;
                    }
                }
            }
            EventPayload::SentimentUpdated { sentiment } => {
                if let Some(keys) = keywords_by_post.get(ev.post_id.as_str()) {
                    for key in keys.clone() {
                        if let Some(acc) = accs.get_mut(&key) {
                            tally_sentiment(acc, *sentiment);
                            acc.last_seen = acc.last_seen.max(ev.at);
                        }
                    }
                }
            }
            EventPayload::EngagementUpdated { engagement } => {
                let raw = engagement.upvotes.max(0) as f64
                    + engagement.comments.max(0) as f64 * 2.0
                    + engagement.shares.max(0) as f64 * 3.0;
                let prev = engagement_by_post
                    .insert(ev.post_id.as_str(), raw)
                    .unwrap_or(0.0);
                let delta = (raw - prev).max(0.0);
                if let Some(keys) = keywords_by_post.get(ev.post_id.as_str()) {
                    for key in keys.clone() {
                        if let Some(acc) = accs.get_mut(&key) {
                            acc.engagement_total += delta;
                            acc.last_seen = acc.last_seen.max(ev.at);
                        }
                    }
                }
            }
            EventPayload::StoryCreated { .. } => {
                if let Some(snapshot) = snapshots.get(&ev.post_id) {
                    *stories_by_source.entry(snapshot.source.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    let keywords = accs
        .into_iter()
        .map(|(key, acc)| {
            let agg = finish(&key, acc, now);
            (key, agg)
        })
        .collect();

    AggregateSet {
        keywords,
        stories_by_source,
        mentions_by_source,
    }
}

fn tally_sentiment(acc: &mut KeywordAcc, sentiment: f32) {
    if sentiment > NEUTRAL_SENTIMENT_BAND {
        acc.positive += 1;
    } else if sentiment < -NEUTRAL_SENTIMENT_BAND {
        acc.negative += 1;
    } else {
        acc.neutral += 1;
    }
}

fn finish(key: &str, acc: KeywordAcc, now: u64) -> KeywordAggregate {
    let span_hours = (acc.last_seen.saturating_sub(acc.first_seen).max(3600)) as f64 / 3600.0;
    let velocity = acc.engagement_total / span_hours;
    let viral = velocity / VIRAL_BASELINE_PER_HOUR;

    let (dominant, confidence) = dominant_sentiment(&acc);
    let primary_category = acc
        .categories
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.clone());

    let mut top_sources: Vec<SourceBreakdown> = acc
        .sources
        .iter()
        .map(|(name, (score_sum, count))| SourceBreakdown {
            name: name.clone(),
            avg_score: if *count > 0 {
                score_sum / *count as f64
            } else {
                0.0
            },
            post_count: *count,
        })
        .collect();
    top_sources.sort_by(|a, b| b.post_count.cmp(&a.post_count).then_with(|| a.name.cmp(&b.name)));
    top_sources.truncate(5);

    KeywordAggregate {
        keyword: key.to_string(),
        total_occurrences: acc.occurrences,
        total_engagement_score: acc.engagement_total,
        viral_coefficient: viral,
        trend_status: trend_status(&acc, now),
        trend_velocity: velocity,
        sentiment_confidence: confidence,
        dominant_sentiment: dominant,
        primary_category,
        keyword_type: infer_keyword_type(&acc.display),
        top_sources,
        last_seen_at: acc.last_seen,
    }
}

fn dominant_sentiment(acc: &KeywordAcc) -> (SentimentLabel, f64) {
    let total = acc.positive + acc.negative + acc.neutral;
    if total == 0 {
        return (SentimentLabel::Neutral, 0.0);
    }
    let (label, count) = if acc.positive >= acc.negative && acc.positive >= acc.neutral {
        (SentimentLabel::Positive, acc.positive)
    } else if acc.negative >= acc.neutral {
        (SentimentLabel::Negative, acc.negative)
    } else {
        (SentimentLabel::Neutral, acc.neutral)
    };
    (label, count as f64 / total as f64)
}

/// Occurrence-window heuristic over the last 6h vs the 6-24h band.
fn trend_status(acc: &KeywordAcc, now: u64) -> TrendStatus {
    if now.saturating_sub(acc.last_seen) >= SEVENTY_TWO_HOURS {
        return TrendStatus::Dormant;
    }
    let recent = acc.recent_occurrences;
    let mid = acc.mid_occurrences;
    if recent == 0 && mid == 0 {
        TrendStatus::Stable
    } else if mid == 0 {
        TrendStatus::Emerging
    } else if recent >= mid * 2 && recent >= 5 {
        TrendStatus::Peak
    } else if recent > mid {
        TrendStatus::Rising
    } else if recent * 2 < mid {
        TrendStatus::Declining
    } else {
        TrendStatus::Stable
    }
}

fn infer_keyword_type(display: &str) -> KeywordType {
    if display.contains(char::is_whitespace) {
        KeywordType::Phrase
    } else if display.chars().next().is_some_and(char::is_uppercase) {
        KeywordType::Entity
    } else {
        KeywordType::Token
    }
}
