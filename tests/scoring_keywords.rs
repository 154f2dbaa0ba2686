// tests/scoring_keywords.rs
//
// Scoring engine contract over hand-built aggregates:
// - exact derived-metric values for a known aggregate
// - inverse freshness enters the composite as 100 - freshness
// - unknown keywords get the neutral default row
// - the full matrix comes back best-first

use std::collections::HashMap;

use trendpulse::scoring::keyword::{
    KeywordAggregate, KeywordType, SentimentLabel, SourceBreakdown, TrendStatus,
};
use trendpulse::scoring::weights::{ScoringWeights, Tier};
use trendpulse::scoring::MetricScoringEngine;

const NOW: u64 = 1_700_000_000;

fn aggregate(keyword: &str, last_seen_at: u64) -> KeywordAggregate {
    KeywordAggregate {
        keyword: keyword.to_string(),
        total_occurrences: 8,
        total_engagement_score: 400.0,
        viral_coefficient: 0.1,
        trend_status: TrendStatus::Rising,
        trend_velocity: 1.5,
        sentiment_confidence: 0.8,
        dominant_sentiment: SentimentLabel::Positive,
        primary_category: Some("technology".into()),
        keyword_type: KeywordType::Entity,
        top_sources: vec![
            SourceBreakdown {
                name: "rust".into(),
                avg_score: 70.0,
                post_count: 5,
            },
            SourceBreakdown {
                name: "programming".into(),
                avg_score: 55.0,
                post_count: 3,
            },
        ],
        last_seen_at,
    }
}

fn engine_with(aggs: Vec<KeywordAggregate>) -> MetricScoringEngine {
    let map: HashMap<String, KeywordAggregate> = aggs
        .into_iter()
        .map(|a| (a.keyword.clone(), a))
        .collect();
    MetricScoringEngine::with_aggregates(
        ScoringWeights::default(),
        map,
        HashMap::new(),
        HashMap::new(),
    )
}

#[test]
fn known_aggregate_produces_exact_derived_metrics() {
    // Last seen 30 minutes ago: freshest bucket.
    let engine = engine_with(vec![aggregate("tokio", NOW - 1800)]);
    let rows = engine.score_keywords(&["tokio".to_string()], NOW);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];

    // synergy = 0.8*100*0.3 + min(400/10,100)*0.4 + 90*0.3 = 24 + 16 + 27
    assert!((row.synergy - 67.0).abs() < 1e-9);
    // relevance = (80 + min(2*20,100) + 15) / 2
    assert!((row.relevance - 67.5).abs() < 1e-9);
    // potential = round(400 + 1.5*24 + 0.1*100) clamped to 100
    assert!((row.engagement_potential - 100.0).abs() < 1e-9);
    // 0.5h since last seen: freshest inverse bucket
    assert!((row.freshness - 2.7).abs() < 1e-9);
    // 8 occurrences fall in the 6..=10 novelty bucket
    assert!((row.novelty - 80.0).abs() < 1e-9);
    assert_eq!(row.trend_status, TrendStatus::Rising);
    assert_eq!(row.dominant_sentiment, SentimentLabel::Positive);
}

#[test]
fn fresher_keyword_outscores_identical_stale_one() {
    // Identical aggregates except last_seen_at: inverse freshness must
    // reward the fresher one through the 100 - freshness term.
    let engine = engine_with(vec![
        aggregate("fresh", NOW - 1800),
        aggregate("stale", NOW - 240 * 3600),
    ]);
    let rows = engine.score_keywords(&["fresh".into(), "stale".into()], NOW);
    assert!((rows[0].freshness - 2.7).abs() < 1e-9);
    assert!((rows[1].freshness - 75.0).abs() < 1e-9);
    assert!(
        rows[0].overall > rows[1].overall,
        "lower (fresher) freshness must raise the composite"
    );
}

#[test]
fn unknown_keyword_yields_neutral_row() {
    let engine = engine_with(vec![]);
    let rows = engine.score_keywords(&["nonexistent".to_string()], NOW);
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.keyword, "nonexistent");
    assert!((row.overall - 50.0).abs() < 1e-9);
    assert_eq!(row.trend_status, TrendStatus::Stable);
    assert_eq!(row.dominant_sentiment, SentimentLabel::Neutral);
    assert_eq!(row.tier, Tier::Tier3);
}

#[test]
fn matrix_is_sorted_best_first() {
    let mut weak = aggregate("weak", NOW - 240 * 3600);
    weak.total_engagement_score = 5.0;
    weak.sentiment_confidence = 0.1;
    weak.trend_status = TrendStatus::Declining;
    weak.trend_velocity = 0.0;
    weak.viral_coefficient = 0.0;

    let engine = engine_with(vec![weak, aggregate("strong", NOW - 1800)]);
    let rows = engine.metric_scoring_matrix(NOW);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].keyword, "strong");
    assert!(rows[0].overall >= rows[1].overall);
}

#[test]
fn lookup_is_case_and_whitespace_insensitive() {
    let engine = engine_with(vec![aggregate("tokio", NOW - 1800)]);
    let rows = engine.score_keywords(&["  ToKiO  ".to_string()], NOW);
    assert!((rows[0].synergy - 67.0).abs() < 1e-9, "must hit the aggregate");
}
