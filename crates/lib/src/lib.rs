//! # Lead Enrichment Orchestration
//!
//! This crate orchestrates batch lead enrichment against an asynchronous
//! external engine: it submits a batch, polls the job to completion, fetches
//! every results page, reconciles each result back to the record it came
//! from, and applies the approved fields with a non-destructive merge.
//!
//! The engine and the downstream record store are consumed through the
//! [`providers::EnrichmentEngine`] and [`providers::CrmApi`] traits, so the
//! whole workflow can be driven against mocks in tests.

pub mod apply;
pub mod cancel;
pub mod config;
pub mod errors;
pub mod matcher;
pub mod orchestrator;
pub mod paginate;
pub mod progress;
pub mod providers;
pub mod types;

pub use apply::{ApplyEngine, ApplyOptions};
pub use cancel::CancelToken;
pub use config::AppConfig;
pub use errors::EnrichError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunOutcome, RunState};
pub use progress::ProgressTracker;
pub use providers::{CrmApi, EnrichmentEngine, HttpCrmApi, HttpEnrichmentEngine};
pub use types::{
    ApplyStatus, ApplyUnit, EnrichField, EnrichedRecord, EnrichmentRequest, InputRecord,
    JobSnapshot, JobStatus, MatchConfidence, NewContact, ProviderStrategy, ResultsPage,
    VerificationLevel,
};
