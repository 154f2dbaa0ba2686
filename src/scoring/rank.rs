// src/scoring/rank.rs
//! Post ranking and per-source leaders.
//!
//! `rank_posts` is a pure function of its inputs: `now` is an argument, the
//! sort is stable, and identical inputs yield identical output order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::events::types::Engagement;
use crate::scoring::weights::{ScoringWeights, Tier};

/// Recency decays linearly to zero over this horizon.
const RECENCY_HORIZON_SECS: u64 = 72 * 3600;

/// Raw per-post state captured at enrichment time. Cache, not truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: String,
    pub title: String,
    /// Originating channel (e.g. subreddit).
    pub source: String,
    pub created_at: u64,
    /// Enrichment quality, [0, 100].
    pub quality: f64,
    /// Enrichment sentiment, [-1, 1].
    pub sentiment: f32,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPost {
    pub post_id: String,
    pub title: String,
    pub source: String,
    pub created_at: u64,
    pub quality_score: f64,
    pub engagement_score: f64,
    pub recency_score: f64,
    pub overall_score: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub top_post: RankedPost,
    pub total_posts: u64,
    pub total_stories: u64,
    pub total_mentions: u64,
}

fn clamp_score(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Weighted engagement on the 0-100 scale: comments and shares signal more
/// effort than upvotes.
pub fn engagement_score(e: &Engagement) -> f64 {
    let upvotes = e.upvotes.max(0) as f64;
    let comments = e.comments.max(0) as f64;
    let shares = e.shares.max(0) as f64;
    ((upvotes + comments * 2.0 + shares * 3.0) / 10.0).min(100.0)
}

/// Linear decay from 100 (just now) to 0 (72h and older).
pub fn recency_score(created_at: u64, now: u64) -> f64 {
    let age = now.saturating_sub(created_at);
    if age >= RECENCY_HORIZON_SECS {
        0.0
    } else {
        (RECENCY_HORIZON_SECS - age) as f64 / RECENCY_HORIZON_SECS as f64 * 100.0
    }
}

fn score_post(post: &PostSnapshot, weights: &ScoringWeights, now: u64) -> RankedPost {
    let quality = clamp_score(post.quality);
    let engagement = engagement_score(&post.engagement);
    let recency = recency_score(post.created_at, now);
    let overall = weights.composite_post(quality, engagement, recency);
    RankedPost {
        post_id: post.id.clone(),
        title: post.title.clone(),
        source: post.source.clone(),
        created_at: post.created_at,
        quality_score: quality,
        engagement_score: engagement,
        recency_score: recency,
        overall_score: overall,
        tier: weights.tier_for(overall),
    }
}

/// Stable sort descending by overall score; ties broken by more recent
/// `created_at`.
pub fn rank_posts(posts: &[PostSnapshot], weights: &ScoringWeights, now: u64) -> Vec<RankedPost> {
    let mut ranked: Vec<RankedPost> = posts.iter().map(|p| score_post(p, weights, now)).collect();
    ranked.sort_by(|a, b| {
        b.overall_score
            .total_cmp(&a.overall_score)
            .then(b.created_at.cmp(&a.created_at))
    });
    ranked
}

/// Per-source leaders: the best post per source plus roll-up counts, sorted
/// by the top post's overall score.
pub fn top_posts_by_source(
    posts: &[PostSnapshot],
    stories_by_source: &HashMap<String, u64>,
    mentions_by_source: &HashMap<String, u64>,
    weights: &ScoringWeights,
    now: u64,
    limit: usize,
) -> Vec<SourceSummary> {
    let ranked = rank_posts(posts, weights, now);

    let mut summaries: HashMap<String, SourceSummary> = HashMap::new();
    for post in ranked {
        let entry = summaries
            .entry(post.source.clone())
            .or_insert_with(|| SourceSummary {
                source: post.source.clone(),
                top_post: post.clone(),
                total_posts: 0,
                total_stories: stories_by_source.get(&post.source).copied().unwrap_or(0),
                total_mentions: mentions_by_source.get(&post.source).copied().unwrap_or(0),
            });
        entry.total_posts += 1;
        // `ranked` is already best-first, so the first post seen per source
        // is its leader.
    }

    let mut out: Vec<SourceSummary> = summaries.into_values().collect();
    out.sort_by(|a, b| {
        b.top_post
            .overall_score
            .total_cmp(&a.top_post.overall_score)
            .then_with(|| a.source.cmp(&b.source))
    });
    out.truncate(limit);
    out
}
