// src/scoring/keyword.rs
//! Keyword aggregates and the derived sub-scores over them.
//!
//! Every function here is a pure, deterministic map from aggregate fields to
//! a score; no clock reads, no I/O. Malformed numeric inputs (NaN, negative
//! counts) are clamped to valid ranges rather than propagated: scoring is
//! advisory, not transactional.

use serde::{Deserialize, Serialize};

use crate::scoring::weights::{ScoringWeights, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Emerging,
    Rising,
    Peak,
    Declining,
    #[default]
    Stable,
    Dormant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordType {
    Entity,
    Phrase,
    #[default]
    Token,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub name: String,
    pub avg_score: f64,
    pub post_count: u64,
}

/// Rolling rollup for one normalized keyword. Derived entirely from the
/// event log plus raw post snapshots: a cache, not a source of truth, safe
/// to discard and rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAggregate {
    pub keyword: String,
    pub total_occurrences: u64,
    pub total_engagement_score: f64,
    /// Rate of score growth relative to a fixed baseline.
    pub viral_coefficient: f64,
    pub trend_status: TrendStatus,
    /// Engagement score units per hour.
    pub trend_velocity: f64,
    /// Confidence of the dominant sentiment, [0, 1].
    pub sentiment_confidence: f64,
    pub dominant_sentiment: SentimentLabel,
    pub primary_category: Option<String>,
    pub keyword_type: KeywordType,
    pub top_sources: Vec<SourceBreakdown>,
    pub last_seen_at: u64,
}

/// Full score row for one keyword. Ephemeral, recomputed per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordScore {
    pub keyword: String,
    pub synergy: f64,
    pub relevance: f64,
    pub engagement_potential: f64,
    /// INVERSE scale: lower means fresher. See [`freshness_coefficient`].
    pub freshness: f64,
    pub novelty: f64,
    pub overall: f64,
    pub tier: Tier,
    pub trend_status: TrendStatus,
    pub dominant_sentiment: SentimentLabel,
}

fn clamp_non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

fn clamp01(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fixed trend-alignment lookup used by the synergy blend.
pub fn trend_alignment(status: TrendStatus) -> f64 {
    match status {
        TrendStatus::Peak => 100.0,
        TrendStatus::Rising => 90.0,
        TrendStatus::Stable => 60.0,
        TrendStatus::Declining | TrendStatus::Emerging | TrendStatus::Dormant => 40.0,
    }
}

/// Synergy: weighted blend of sentiment confidence, engagement, and trend
/// alignment (0.3 / 0.4 / 0.3).
pub fn synergy_score(agg: &KeywordAggregate) -> f64 {
    let confidence = clamp01(agg.sentiment_confidence) * 100.0;
    let engagement = (clamp_non_negative(agg.total_engagement_score) / 10.0).min(100.0);
    let alignment = trend_alignment(agg.trend_status);
    (confidence * 0.3 + engagement * 0.4 + alignment * 0.3).clamp(0.0, 100.0)
}

/// Relevance: category presence, source diversity, and keyword-type bonus,
/// halved and capped at 100.
pub fn relevance_coefficient(agg: &KeywordAggregate) -> f64 {
    let category_bonus = if agg.primary_category.is_some() {
        80.0
    } else {
        40.0
    };
    let source_diversity_bonus = ((agg.top_sources.len() as f64) * 20.0).min(100.0);
    let type_bonus = match agg.keyword_type {
        KeywordType::Phrase => 20.0,
        KeywordType::Entity => 15.0,
        KeywordType::Token => 10.0,
    };
    ((category_bonus + source_diversity_bonus + type_bonus) / 2.0).min(100.0)
}

/// Engagement potential: 24-hour-ahead linear projection, capped at 100.
/// Assumes `trend_velocity` is expressed per hour.
pub fn engagement_potential(agg: &KeywordAggregate) -> f64 {
    let current = clamp_non_negative(agg.total_engagement_score);
    let velocity = if agg.trend_velocity.is_finite() {
        agg.trend_velocity
    } else {
        0.0
    };
    let viral = clamp_non_negative(agg.viral_coefficient);
    (current + velocity * 24.0 + viral * 100.0)
        .round()
        .clamp(0.0, 100.0)
}

/// Freshness coefficient, bucketed by hours since last activity.
///
/// INVERSE SCALE: lower is fresher. This mirrors a recency-decay convention
/// the dashboards already depend on; do not "fix" it into a 0-100
/// higher-is-better score. Any UI rendering this value must document the
/// inversion.
pub fn freshness_coefficient(hours_since_last_seen: f64) -> f64 {
    let hours = clamp_non_negative(hours_since_last_seen);
    if hours < 1.0 {
        2.7
    } else if hours < 6.0 {
        10.0
    } else if hours < 24.0 {
        25.0
    } else if hours < 72.0 {
        50.0
    } else {
        75.0
    }
}

/// Novelty index, bucketed by total occurrences: rarer means more novel.
pub fn novelty_index(total_occurrences: u64) -> f64 {
    match total_occurrences {
        0..=5 => 100.0,
        6..=10 => 80.0,
        11..=20 => 60.0,
        21..=50 => 40.0,
        _ => 20.0,
    }
}

/// Score one aggregate. `now` is passed in so the result is a pure function
/// of its inputs.
pub fn score_keyword(agg: &KeywordAggregate, weights: &ScoringWeights, now: u64) -> KeywordScore {
    let hours_since = now.saturating_sub(agg.last_seen_at) as f64 / 3600.0;
    let synergy = synergy_score(agg);
    let relevance = relevance_coefficient(agg);
    let potential = engagement_potential(agg);
    let freshness = freshness_coefficient(hours_since);
    let novelty = novelty_index(agg.total_occurrences);
    let overall = weights.composite_keyword(synergy, relevance, potential, novelty, freshness);

    KeywordScore {
        keyword: agg.keyword.clone(),
        synergy,
        relevance,
        engagement_potential: potential,
        freshness,
        novelty,
        overall,
        tier: weights.tier_for(overall),
        trend_status: agg.trend_status,
        dominant_sentiment: agg.dominant_sentiment,
    }
}

/// Neutral default row for a keyword the pipeline has never seen: 50 for the
/// bounded 0-100 metrics, stable/neutral categoricals. Ranking UIs always
/// get a renderable row, never an error.
pub fn neutral_score(keyword: &str, weights: &ScoringWeights) -> KeywordScore {
    KeywordScore {
        keyword: keyword.to_string(),
        synergy: 50.0,
        relevance: 50.0,
        engagement_potential: 50.0,
        freshness: 50.0,
        novelty: 50.0,
        overall: 50.0,
        tier: weights.tier_for(50.0),
        trend_status: TrendStatus::Stable,
        dominant_sentiment: SentimentLabel::Neutral,
    }
}
