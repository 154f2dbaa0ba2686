// tests/rank_posts.rs
//
// Post ranking contract:
// - pure function of inputs: same inputs, same output, input order ignored
// - descending overall score with newer-post tiebreak
// - per-source summaries pick each source's leader and carry roll-up counts

use std::collections::HashMap;

use trendpulse::events::types::{Engagement, EventPayload, NewEvent};
use trendpulse::events::EnrichmentEventLog;
use trendpulse::scoring::rank::PostSnapshot;
use trendpulse::scoring::weights::ScoringWeights;
use trendpulse::scoring::MetricScoringEngine;

const NOW: u64 = 1_700_000_000;

fn snapshot(id: &str, source: &str, created_at: u64, quality: f64, upvotes: i64) -> PostSnapshot {
    PostSnapshot {
        id: id.into(),
        title: format!("post {id}"),
        source: source.into(),
        created_at,
        quality,
        sentiment: 0.0,
        engagement: Engagement {
            upvotes,
            comments: 0,
            shares: 0,
        },
    }
}

fn engine() -> MetricScoringEngine {
    MetricScoringEngine::new(ScoringWeights::default())
}

#[test]
fn high_quality_fresh_post_beats_stale_low_quality_one() {
    let p1 = snapshot("p1", "rust", NOW - 3600, 90.0, 500);
    let p2 = snapshot("p2", "rust", NOW - 60 * 3600, 40.0, 50);

    let ranked = engine().rank_posts(&[p2.clone(), p1.clone()], NOW);
    assert_eq!(ranked[0].post_id, "p1");
    assert_eq!(ranked[1].post_id, "p2");
    assert!(ranked[0].overall_score > ranked[1].overall_score);
}

#[test]
fn ranking_ignores_input_order() {
    let posts = vec![
        snapshot("a", "rust", NOW - 7200, 60.0, 100),
        snapshot("b", "rust", NOW - 3600, 80.0, 300),
        snapshot("c", "golang", NOW - 600, 70.0, 200),
    ];
    let mut reversed = posts.clone();
    reversed.reverse();

    let e = engine();
    let first = e.rank_posts(&posts, NOW);
    let second = e.rank_posts(&reversed, NOW);
    assert_eq!(first, second, "ranking must be a pure function of inputs");
}

#[test]
fn equal_scores_break_ties_toward_the_newer_post() {
    // Zero out quality and engagement differences; recency weight zeroed so
    // the overall scores are exactly equal and only the tiebreak differs.
    let mut weights = ScoringWeights::default();
    weights.w_recency = 0.0;
    let e = MetricScoringEngine::with_aggregates(
        weights,
        HashMap::new(),
        HashMap::new(),
        HashMap::new(),
    );

    let older = snapshot("older", "rust", NOW - 7200, 50.0, 100);
    let newer = snapshot("newer", "rust", NOW - 600, 50.0, 100);

    let ranked = e.rank_posts(&[older, newer], NOW);
    assert_eq!(ranked[0].overall_score, ranked[1].overall_score);
    assert_eq!(ranked[0].post_id, "newer");
}

#[tokio::test]
async fn enriched_engaged_post_ranks_above_weak_one() {
    // Emit the enrichment facts first, as the orchestrator would, then rank
    // the corresponding snapshots.
    let log = EnrichmentEventLog::in_memory();
    log.emit(NewEvent::new(
        "p1",
        "sess",
        EventPayload::PostEnriched {
            subreddit: Some("rust".into()),
            entities: vec!["Tokio".into()],
            sentiment: 0.8,
            quality: 90.0,
            categories: vec!["technology".into()],
            thread_id: None,
            is_cross_post: false,
        },
    ))
    .await
    .expect("emit p1 enrichment");
    log.emit(NewEvent::new(
        "p1",
        "sess",
        EventPayload::EngagementUpdated {
            engagement: Engagement {
                upvotes: 500,
                comments: 0,
                shares: 0,
            },
        },
    ))
    .await
    .expect("emit p1 engagement");

    let p1 = PostSnapshot {
        id: "p1".into(),
        title: "strong".into(),
        source: "rust".into(),
        created_at: NOW - 3600,
        quality: 90.0,
        sentiment: 0.8,
        engagement: Engagement {
            upvotes: 500,
            comments: 0,
            shares: 0,
        },
    };
    let p2 = PostSnapshot {
        id: "p2".into(),
        title: "weak".into(),
        source: "rust".into(),
        created_at: NOW - 3600,
        quality: 20.0,
        sentiment: 0.1,
        engagement: Engagement {
            upvotes: 5,
            comments: 0,
            shares: 0,
        },
    };

    let ranked = engine().rank_posts(&[p2, p1], NOW);
    assert_eq!(ranked[0].post_id, "p1");
    assert!(ranked[0].overall_score > ranked[1].overall_score);
    assert_eq!(log.by_post("p1").await.expect("by_post").len(), 2);
}

#[test]
fn source_summaries_pick_leaders_and_carry_counts() {
    let posts = vec![
        snapshot("r1", "rust", NOW - 3600, 90.0, 400),
        snapshot("r2", "rust", NOW - 7200, 50.0, 50),
        snapshot("g1", "golang", NOW - 3600, 60.0, 100),
    ];
    let mut stories = HashMap::new();
    stories.insert("rust".to_string(), 2u64);
    let mut mentions = HashMap::new();
    mentions.insert("rust".to_string(), 17u64);
    mentions.insert("golang".to_string(), 4u64);

    let e = MetricScoringEngine::with_aggregates(
        ScoringWeights::default(),
        HashMap::new(),
        stories,
        mentions,
    );

    let summaries = e.top_posts_by_source(&posts, NOW, 10);
    assert_eq!(summaries.len(), 2);

    let rust = summaries.iter().find(|s| s.source == "rust").expect("rust");
    assert_eq!(rust.top_post.post_id, "r1");
    assert_eq!(rust.total_posts, 2);
    assert_eq!(rust.total_stories, 2);
    assert_eq!(rust.total_mentions, 17);

    let golang = summaries
        .iter()
        .find(|s| s.source == "golang")
        .expect("golang");
    assert_eq!(golang.top_post.post_id, "g1");
    assert_eq!(golang.total_stories, 0);

    // Best leader first.
    assert_eq!(summaries[0].source, "rust");
}
