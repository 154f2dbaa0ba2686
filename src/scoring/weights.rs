// src/scoring/weights.rs
//! # Scoring Weights
//! Composite weights and tier cutoffs as runtime configuration.
//!
//! The composite formula is tuned empirically and iterated on; none of the
//! weights here are hard invariants. Loads from TOML with a built-in seed
//! fallback, overridable via `SCORING_CONFIG_PATH`.

use serde::Deserialize;
use std::{fs, path::Path};

pub const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";
pub const ENV_SCORING_CONFIG_PATH: &str = "SCORING_CONFIG_PATH";

/// Discrete performance bucket, Tier1 (top) down to Tier4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
    Tier4,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringWeights {
    // Keyword composite.
    #[serde(default = "d_synergy")]
    pub w_synergy: f64,
    #[serde(default = "d_relevance")]
    pub w_relevance: f64,
    #[serde(default = "d_engagement")]
    pub w_engagement: f64,
    #[serde(default = "d_novelty")]
    pub w_novelty: f64,
    #[serde(default = "d_freshness")]
    pub w_freshness: f64,

    // Post composite.
    #[serde(default = "d_quality")]
    pub w_quality: f64,
    #[serde(default = "d_post_engagement")]
    pub w_post_engagement: f64,
    #[serde(default = "d_recency")]
    pub w_recency: f64,

    // Tier cutoffs on the 0-100 overall score.
    #[serde(default = "d_tier1")]
    pub tier1_cutoff: f64,
    #[serde(default = "d_tier2")]
    pub tier2_cutoff: f64,
    #[serde(default = "d_tier3")]
    pub tier3_cutoff: f64,
}

fn d_synergy() -> f64 {
    0.25
}
fn d_relevance() -> f64 {
    0.20
}
fn d_engagement() -> f64 {
    0.25
}
fn d_novelty() -> f64 {
    0.15
}
fn d_freshness() -> f64 {
    0.15
}
fn d_quality() -> f64 {
    0.40
}
fn d_post_engagement() -> f64 {
    0.40
}
fn d_recency() -> f64 {
    0.20
}
fn d_tier1() -> f64 {
    80.0
}
fn d_tier2() -> f64 {
    60.0
}
fn d_tier3() -> f64 {
    40.0
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            w_synergy: d_synergy(),
            w_relevance: d_relevance(),
            w_engagement: d_engagement(),
            w_novelty: d_novelty(),
            w_freshness: d_freshness(),
            w_quality: d_quality(),
            w_post_engagement: d_post_engagement(),
            w_recency: d_recency(),
            tier1_cutoff: d_tier1(),
            tier2_cutoff: d_tier2(),
            tier3_cutoff: d_tier3(),
        }
    }
}

impl ScoringWeights {
    /// Load from a TOML file, falling back to the seed defaults on any error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Resolve the config path from the environment, then load.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_SCORING_CONFIG_PATH)
            .unwrap_or_else(|_| DEFAULT_SCORING_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }

    /// Keyword composite on the 0-100 scale. The freshness coefficient is an
    /// inverse metric (lower = fresher), so it enters as `100 - freshness`
    /// to keep this formula "higher = better" throughout.
    pub fn composite_keyword(
        &self,
        synergy: f64,
        relevance: f64,
        engagement_potential: f64,
        novelty: f64,
        freshness: f64,
    ) -> f64 {
        let denom = (self.w_synergy
            + self.w_relevance
            + self.w_engagement
            + self.w_novelty
            + self.w_freshness)
            .max(1e-6);
        let raw = synergy * self.w_synergy
            + relevance * self.w_relevance
            + engagement_potential * self.w_engagement
            + novelty * self.w_novelty
            + (100.0 - freshness).clamp(0.0, 100.0) * self.w_freshness;
        (raw / denom).clamp(0.0, 100.0)
    }

    /// Post composite: quality, engagement, recency, all 0-100.
    pub fn composite_post(&self, quality: f64, engagement: f64, recency: f64) -> f64 {
        let denom = (self.w_quality + self.w_post_engagement + self.w_recency).max(1e-6);
        let raw = quality * self.w_quality
            + engagement * self.w_post_engagement
            + recency * self.w_recency;
        (raw / denom).clamp(0.0, 100.0)
    }

    pub fn tier_for(&self, overall: f64) -> Tier {
        if overall >= self.tier1_cutoff {
            Tier::Tier1
        } else if overall >= self.tier2_cutoff {
            Tier::Tier2
        } else if overall >= self.tier3_cutoff {
            Tier::Tier3
        } else {
            Tier::Tier4
        }
    }
}
