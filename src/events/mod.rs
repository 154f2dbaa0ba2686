// src/events/mod.rs
//! # Enrichment Event Log
//! Append-only record of enrichment facts about content items, independent
//! of and outliving any single query/session. Events are the only way state
//! about a post accumulates; nothing is ever deleted or rewritten. The sole
//! permitted mutation is the `processed` acknowledgment flag.

pub mod store;
pub mod types;

use std::sync::Arc;

use metrics::counter;

use crate::error::EventLogError;
use store::{EventStore, MemoryEventStore};
use types::{EnrichmentEvent, EventId, EventKind, EventPayload, NewEvent, PendingEvent};

/// Validation + stamping front for an [`EventStore`]. Storage errors pass
/// through to the caller for retry; the log never retries silently.
pub struct EnrichmentEventLog {
    store: Arc<dyn EventStore>,
}

impl EnrichmentEventLog {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEventStore::new()))
    }

    /// Validate and append a single event. Returns the assigned id.
    pub async fn emit(&self, input: NewEvent) -> Result<EventId, EventLogError> {
        let ids = self.emit_batch(vec![input]).await?;
        Ok(ids[0])
    }

    /// Validate and append a batch atomically. Any invalid event rejects the
    /// whole batch before anything is written; partial failure can never
    /// produce partial writes. `at` values within the batch share one stamp,
    /// so they are non-decreasing.
    pub async fn emit_batch(&self, inputs: Vec<NewEvent>) -> Result<Vec<EventId>, EventLogError> {
        for input in &inputs {
            if let Err(e) = validate(input) {
                counter!("events_rejected_total").increment(1);
                return Err(e);
            }
        }
        let now = now_unix();
        let pending: Vec<PendingEvent> = inputs
            .into_iter()
            .map(|i| PendingEvent {
                at: i.at_override.unwrap_or(now),
                post_id: i.post_id,
                session_id: i.session_id,
                payload: i.payload,
            })
            .collect();
        let count = pending.len() as u64;
        let ids = self.store.append_batch(pending).await?;
        counter!("events_emitted_total").increment(count);
        Ok(ids)
    }

    /// Acknowledge an event. Idempotent: marking twice is a no-op.
    pub async fn mark_processed(&self, id: EventId) -> Result<(), EventLogError> {
        self.store.mark_processed(id).await
    }

    pub async fn by_post(&self, post_id: &str) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        self.store.by_post(post_id).await
    }

    pub async fn by_kind(&self, kind: EventKind) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        self.store.by_kind(kind).await
    }

    pub async fn unprocessed(
        &self,
        kind: Option<EventKind>,
    ) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        self.store.unprocessed(kind).await
    }

    /// Events with `from <= at < to`. Storage order is not temporal order;
    /// consumers sort by `at` when it matters.
    pub async fn in_window(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        self.store.in_window(from, to).await
    }

    /// Everything appended so far.
    pub async fn all(&self) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        self.store.in_window(0, u64::MAX).await
    }
}

/// Kind-specific required-field checks. Rejects the offending event
/// synchronously, before any storage call.
fn validate(input: &NewEvent) -> Result<(), EventLogError> {
    if input.post_id.trim().is_empty() {
        return Err(EventLogError::Validation("post_id must be non-empty".into()));
    }
    if input.session_id.trim().is_empty() {
        return Err(EventLogError::Validation(
            "session_id must be non-empty".into(),
        ));
    }
    match &input.payload {
        EventPayload::PostEnriched {
            sentiment, quality, ..
        } => {
            validate_sentiment(*sentiment)?;
            if !quality.is_finite() || !(0.0..=100.0).contains(quality) {
                return Err(EventLogError::Validation(format!(
                    "quality must be within [0, 100], got {quality}"
                )));
            }
        }
        EventPayload::StoryCreated { story_id, .. } => {
            if story_id.trim().is_empty() {
                return Err(EventLogError::Validation(
                    "story_created requires a story_id".into(),
                ));
            }
        }
        EventPayload::SentimentUpdated { sentiment } => validate_sentiment(*sentiment)?,
        EventPayload::EngagementUpdated { engagement } => {
            if engagement.upvotes < 0 || engagement.comments < 0 || engagement.shares < 0 {
                return Err(EventLogError::Validation(
                    "engagement counts must be non-negative".into(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_sentiment(sentiment: f32) -> Result<(), EventLogError> {
    if !sentiment.is_finite() || !(-1.0..=1.0).contains(&sentiment) {
        return Err(EventLogError::Validation(format!(
            "sentiment must be within [-1, 1], got {sentiment}"
        )));
    }
    Ok(())
}

fn now_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
