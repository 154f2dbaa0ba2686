//! Error taxonomy for the ingestion pipeline.
//!
//! Client-layer transient errors carry a machine-readable retry hint; the
//! orchestrator owns retry scheduling, the client never sleeps internally.

use thiserror::Error;

/// Errors surfaced by the upstream source client.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP 429 from the upstream API. The hint comes from the Retry-After
    /// header when present, otherwise from the breaker's backoff schedule.
    #[error("rate limited by upstream, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Circuit is open: the call failed fast and no network I/O happened.
    #[error("circuit open, retry after {retry_after_secs}s")]
    CircuitOpen { retry_after_secs: u64 },

    /// 401/403 that survived a one-time token refresh retry.
    #[error("access blocked by upstream")]
    AccessBlocked,

    /// Token exchange failed. Callers degrade to the anonymous tier.
    #[error("token exchange failed: {0}")]
    Auth(String),

    /// Caller-initiated cancel. Never counted as a circuit failure.
    #[error("request cancelled by caller")]
    Cancelled,

    /// Non-2xx status outside the dedicated classes above.
    #[error("upstream returned status {status}")]
    Upstream { status: u16 },

    /// Connection-level failure (DNS, TLS, reset, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx with a body that does not match the listing envelope.
    #[error("malformed upstream payload: {0}")]
    Decode(String),
}

impl SourceError {
    /// Retry hint in seconds, when the error is retryable at all.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            SourceError::RateLimited { retry_after_secs }
            | SourceError::CircuitOpen { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Transient conditions map to a "temporarily degraded" response at the
    /// orchestrator boundary, distinct from hard failures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::CircuitOpen { .. }
        )
    }
}

/// Errors surfaced by the enrichment event log.
#[derive(Error, Debug)]
pub enum EventLogError {
    /// A kind-specific required field is missing or out of range. Rejects
    /// only the offending event (or its whole batch), never corrupts
    /// previously appended events.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backing store is unreachable. Surfaced to the caller for retry;
    /// the log performs no silent retries itself.
    #[error("event store unavailable: {0}")]
    StorageUnavailable(String),

    /// `mark_processed` was called with an id the store has never assigned.
    #[error("unknown event id {0}")]
    UnknownEvent(u64),
}
