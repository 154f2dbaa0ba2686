// src/events/store.rs
//! Abstract append-only store plus the in-memory implementation.
//!
//! The store is the persistence boundary: an external hosted database sits
//! behind the same trait in production. Four access patterns are required:
//! by post id, by processed flag, by kind, by timestamp window.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::EventLogError;
use crate::events::types::{EnrichmentEvent, EventId, EventKind, PendingEvent};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a batch atomically and return the assigned ids (monotonic,
    /// in batch order). All-or-nothing: a failed batch writes nothing.
    async fn append_batch(
        &self,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<EventId>, EventLogError>;

    async fn by_post(&self, post_id: &str) -> Result<Vec<EnrichmentEvent>, EventLogError>;

    async fn by_kind(&self, kind: EventKind) -> Result<Vec<EnrichmentEvent>, EventLogError>;

    async fn unprocessed(
        &self,
        kind: Option<EventKind>,
    ) -> Result<Vec<EnrichmentEvent>, EventLogError>;

    /// Events with `from <= at < to`.
    async fn in_window(&self, from: u64, to: u64) -> Result<Vec<EnrichmentEvent>, EventLogError>;

    /// Flip `processed` to true. Idempotent: marking twice is a no-op.
    /// Unknown ids are an error.
    async fn mark_processed(&self, id: EventId) -> Result<(), EventLogError>;
}

/// In-memory store. Single mutex gives atomic single appends and
/// all-or-nothing batches under concurrent writers.
#[derive(Default)]
pub struct MemoryEventStore {
    inner: Mutex<Vec<EnrichmentEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append_batch(
        &self,
        events: Vec<PendingEvent>,
    ) -> Result<Vec<EventId>, EventLogError> {
        let mut g = self.inner.lock().expect("event store mutex poisoned");
        let mut ids = Vec::with_capacity(events.len());
        let mut next = g.len() as EventId + 1;
        for ev in events {
            ids.push(next);
            g.push(EnrichmentEvent {
                id: next,
                at: ev.at,
                post_id: ev.post_id,
                session_id: ev.session_id,
                payload: ev.payload,
                processed: false,
            });
            next += 1;
        }
        Ok(ids)
    }

    async fn by_post(&self, post_id: &str) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        let g = self.inner.lock().expect("event store mutex poisoned");
        Ok(g.iter().filter(|e| e.post_id == post_id).cloned().collect())
    }

    async fn by_kind(&self, kind: EventKind) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        let g = self.inner.lock().expect("event store mutex poisoned");
        Ok(g.iter().filter(|e| e.kind() == kind).cloned().collect())
    }

    async fn unprocessed(
        &self,
        kind: Option<EventKind>,
    ) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        let g = self.inner.lock().expect("event store mutex poisoned");
        Ok(g.iter()
            .filter(|e| !e.processed && kind.map_or(true, |k| e.kind() == k))
            .cloned()
            .collect())
    }

    async fn in_window(&self, from: u64, to: u64) -> Result<Vec<EnrichmentEvent>, EventLogError> {
        let g = self.inner.lock().expect("event store mutex poisoned");
        Ok(g.iter()
            .filter(|e| e.at >= from && e.at < to)
            .cloned()
            .collect())
    }

    async fn mark_processed(&self, id: EventId) -> Result<(), EventLogError> {
        let mut g = self.inner.lock().expect("event store mutex poisoned");
        match g.iter_mut().find(|e| e.id == id) {
            Some(ev) => {
                ev.processed = true;
                Ok(())
            }
            None => Err(EventLogError::UnknownEvent(id)),
        }
    }
}
