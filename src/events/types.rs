// src/events/types.rs
//! Typed enrichment events. The payload is a tagged union over the four
//! event kinds, so kind-specific required fields are enforced by the type
//! system and decoded via exhaustive matching instead of field probing.

use serde::{Deserialize, Serialize};

pub type EventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PostEnriched,
    StoryCreated,
    SentimentUpdated,
    EngagementUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PostEnriched => "post_enriched",
            EventKind::StoryCreated => "story_created",
            EventKind::SentimentUpdated => "sentiment_updated",
            EventKind::EngagementUpdated => "engagement_updated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub upvotes: i64,
    pub comments: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    PostEnriched {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subreddit: Option<String>,
        #[serde(default)]
        entities: Vec<String>,
        /// Sentiment in [-1.0, 1.0].
        sentiment: f32,
        /// Quality in [0.0, 100.0].
        quality: f32,
        #[serde(default)]
        categories: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
        #[serde(default)]
        is_cross_post: bool,
    },
    StoryCreated {
        story_id: String,
        #[serde(default)]
        story_themes: Vec<String>,
    },
    SentimentUpdated {
        sentiment: f32,
    },
    EngagementUpdated {
        engagement: Engagement,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::PostEnriched { .. } => EventKind::PostEnriched,
            EventPayload::StoryCreated { .. } => EventKind::StoryCreated,
            EventPayload::SentimentUpdated { .. } => EventKind::SentimentUpdated,
            EventPayload::EngagementUpdated { .. } => EventKind::EngagementUpdated,
        }
    }
}

/// Input to `emit`. The log stamps `at` unless overridden; the override is
/// meant for batch/migration replay only.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub post_id: String,
    pub session_id: String,
    pub at_override: Option<u64>,
    pub payload: EventPayload,
}

impl NewEvent {
    pub fn new(
        post_id: impl Into<String>,
        session_id: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            session_id: session_id.into(),
            at_override: None,
            payload,
        }
    }

    /// Explicit timestamp for replay.
    pub fn at(mut self, ts_unix: u64) -> Self {
        self.at_override = Some(ts_unix);
        self
    }
}

/// An event as stored: immutable once appended except for `processed`,
/// which flips to true exactly once when a consumer acknowledges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentEvent {
    pub id: EventId,
    /// Unix seconds. Non-decreasing within one emit batch; the log as a
    /// whole is not globally time-ordered, sort by `at` when order matters.
    pub at: u64,
    pub post_id: String,
    pub session_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
    pub processed: bool,
}

impl EnrichmentEvent {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Validated input waiting for the store to assign an id.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub at: u64,
    pub post_id: String,
    pub session_id: String,
    pub payload: EventPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_kind_tag() {
        let p = EventPayload::StoryCreated {
            story_id: "s1".into(),
            story_themes: vec!["energy".into()],
        };
        let json = serde_json::to_value(&p).expect("serialize");
        assert_eq!(json["kind"], "story_created");
        assert_eq!(json["story_id"], "s1");
    }

    #[test]
    fn payload_roundtrips_through_flattened_event() {
        let ev = EnrichmentEvent {
            id: 7,
            at: 1_700_000_000,
            post_id: "p1".into(),
            session_id: "sess".into(),
            payload: EventPayload::EngagementUpdated {
                engagement: Engagement {
                    upvotes: 10,
                    comments: 2,
                    shares: 1,
                },
            },
            processed: false,
        };
        let json = serde_json::to_string(&ev).expect("serialize");
        let back: EnrichmentEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ev);
        assert_eq!(back.kind(), EventKind::EngagementUpdated);
    }
}
