// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod scoring;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::client::SourceClient;
pub use crate::events::EnrichmentEventLog;
pub use crate::orchestrator::{IngestOutcome, IngestionOrchestrator};
pub use crate::scoring::MetricScoringEngine;
