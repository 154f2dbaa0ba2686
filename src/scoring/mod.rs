// src/scoring/mod.rs
//! # Metric Scoring Engine
//! Converts keyword/post/source aggregates into normalized, comparable
//! scores for ranking and tiering. Never raises for missing or partial
//! data: unknown keywords get neutral defaults and malformed numbers are
//! clamped, because scores are best-effort analytics.

pub mod keyword;
pub mod rank;
pub mod weights;

use std::collections::HashMap;

use keyword::{neutral_score, score_keyword, KeywordAggregate, KeywordScore};
use rank::{rank_posts, top_posts_by_source, PostSnapshot, RankedPost, SourceSummary};
use weights::ScoringWeights;

pub struct MetricScoringEngine {
    weights: ScoringWeights,
    aggregates: HashMap<String, KeywordAggregate>,
    stories_by_source: HashMap<String, u64>,
    mentions_by_source: HashMap<String, u64>,
}

impl MetricScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            aggregates: HashMap::new(),
            stories_by_source: HashMap::new(),
            mentions_by_source: HashMap::new(),
        }
    }

    pub fn with_aggregates(
        weights: ScoringWeights,
        aggregates: HashMap<String, KeywordAggregate>,
        stories_by_source: HashMap<String, u64>,
        mentions_by_source: HashMap<String, u64>,
    ) -> Self {
        Self {
            weights,
            aggregates,
            stories_by_source,
            mentions_by_source,
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a keyword list. Unknown keywords yield the documented neutral
    /// default row instead of an error, so ranking UIs always get a
    /// renderable row per input.
    pub fn score_keywords(&self, keywords: &[String], now: u64) -> Vec<KeywordScore> {
        keywords
            .iter()
            .map(|k| {
                let key = k.trim().to_lowercase();
                match self.aggregates.get(&key) {
                    Some(agg) => score_keyword(agg, &self.weights, now),
                    None => neutral_score(k, &self.weights),
                }
            })
            .collect()
    }

    /// Full scoring matrix over every known keyword, best first.
    pub fn metric_scoring_matrix(&self, now: u64) -> Vec<KeywordScore> {
        let mut rows: Vec<KeywordScore> = self
            .aggregates
            .values()
            .map(|agg| score_keyword(agg, &self.weights, now))
            .collect();
        rows.sort_by(|a, b| {
            b.overall
                .total_cmp(&a.overall)
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        rows
    }

    pub fn rank_posts(&self, posts: &[PostSnapshot], now: u64) -> Vec<RankedPost> {
        rank_posts(posts, &self.weights, now)
    }

    pub fn top_posts_by_source(
        &self,
        posts: &[PostSnapshot],
        now: u64,
        limit: usize,
    ) -> Vec<SourceSummary> {
        top_posts_by_source(
            posts,
            &self.stories_by_source,
            &self.mentions_by_source,
            &self.weights,
            now,
            limit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyword::{KeywordType, SentimentLabel, TrendStatus};

    #[test]
    fn unknown_keyword_gets_neutral_row() {
        let engine = MetricScoringEngine::new(ScoringWeights::default());
        let rows = engine.score_keywords(&["unknown-keyword".to_string()], 1_700_000_000);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].keyword, "unknown-keyword");
        assert_eq!(rows[0].overall, 50.0);
        assert_eq!(rows[0].trend_status, TrendStatus::Stable);
        assert_eq!(rows[0].dominant_sentiment, SentimentLabel::Neutral);
    }

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        let now = 1_700_000_000;
        let agg = KeywordAggregate {
            keyword: "tokio".into(),
            total_occurrences: 3,
            total_engagement_score: 100.0,
            viral_coefficient: 0.0,
            trend_status: TrendStatus::Rising,
            trend_velocity: 0.0,
            sentiment_confidence: 0.9,
            dominant_sentiment: SentimentLabel::Positive,
            primary_category: None,
            keyword_type: KeywordType::Entity,
            top_sources: vec![],
            last_seen_at: now,
        };
        let engine = MetricScoringEngine::with_aggregates(
            ScoringWeights::default(),
            HashMap::from([("tokio".to_string(), agg)]),
            HashMap::new(),
            HashMap::new(),
        );
        let rows = engine.score_keywords(&["ToKiO".to_string()], now);
        assert_eq!(rows[0].dominant_sentiment, SentimentLabel::Positive);
        assert_ne!(rows[0].overall, 50.0);
    }
}
