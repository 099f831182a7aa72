//! # Core Data Model
//!
//! The strict, fully-typed shapes that flow between the workflow components.
//! Loosely-typed wire payloads are normalized into these types at the client
//! boundary (see `providers::engine`); nothing downstream of the clients
//! touches `serde_json::Value` except the opaque correlation payload.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The key under which a record's id is stamped into its correlation payload
/// at submission time, and read back from the echoed `extra` when matching.
pub const CORRELATION_KEY: &str = "record_id";

/// A business record submitted for enrichment.
///
/// Immutable once a batch has been submitted; the `extra` payload is echoed
/// back unchanged by the engine and used for identity reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InputRecord {
    /// Stable identifier of the record in the caller's system.
    pub id: String,
    /// Company or record name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form street address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Caller-supplied correlation payload, passed through the engine verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// The kinds of fields the engine can be asked to discover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichField {
    Email,
    Phone,
    Address,
    ContactName,
    ContactTitle,
}

/// How the engine should walk its provider list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStrategy {
    /// Try providers in order until one returns a value for the field.
    Waterfall,
    /// Use only the first provider in the list.
    Single,
}

/// How far discovered values should be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// Syntactic checks only.
    Format,
    /// Format checks plus deliverability probing (e.g. SMTP handshake).
    Deliverability,
}

/// Configuration for one enrichment batch. Created once per run, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentRequest {
    pub records: Vec<InputRecord>,
    /// Which field kinds to enrich.
    pub fields: Vec<EnrichField>,
    pub strategy: ProviderStrategy,
    /// Ordered provider list consumed according to `strategy`.
    pub providers: Vec<String>,
    pub verification: VerificationLevel,
    /// Skip records whose requested fields are already populated.
    pub skip_filled: bool,
    /// How many records the engine processes per progress increment.
    pub chunk_size: u32,
}

/// Server-side job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// A terminal status means no further progress snapshots are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One observation of a job's progress, produced by polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub processed: u64,
    pub enriched: u64,
    pub failed: u64,
    pub skipped: u64,
    pub current_chunk: u32,
    pub total_chunks: u32,
    pub progress_percent: f32,
    /// Human-readable errors reported by the engine so far.
    pub errors: Vec<String>,
}

/// Per-field validation outcome reported by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldValidation {
    pub format_valid: bool,
    /// Only present when deliverability verification was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable: Option<bool>,
}

/// Metadata describing what the engine actually did for one record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentMeta {
    pub fields_enriched: Vec<String>,
    pub fields_missing: Vec<String>,
    pub providers_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_calls: Option<u32>,
}

/// One enriched result row. Produced once by the engine; never mutated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Raw discovered phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Validated national-format representation, preferred over `phone`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_normalized: Option<String>,
    /// Raw discovered address line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Provider-standardized address string, preferred over `address`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_title: Option<String>,
    /// Which provider supplied each field, keyed by field name.
    #[serde(default)]
    pub sources: HashMap<String, String>,
    /// Validation results keyed by field name.
    #[serde(default)]
    pub validation: HashMap<String, FieldValidation>,
    /// The correlation payload echoed back from the matching `InputRecord`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
    #[serde(default)]
    pub meta: EnrichmentMeta,
}

/// Lifecycle of an apply unit. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Pending,
    Applied,
    Error,
}

/// How confident the matcher was when pairing a result with its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Correlation identifier matched exactly.
    Id,
    /// Case-insensitive name match.
    Name,
    /// Paired by submission-order index.
    Position,
    /// Last-resort pairing with the first record in the batch.
    Fallback,
}

/// The reconciliation of one `InputRecord` with its `EnrichedRecord`,
/// waiting to be applied (or already applied).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyUnit {
    pub record: InputRecord,
    pub enriched: EnrichedRecord,
    pub status: ApplyStatus,
    /// Field names actually written by the apply step.
    pub fields_updated: Vec<String>,
    pub confidence: MatchConfidence,
    /// Populated when the record-update call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyUnit {
    /// Creates a fresh pending unit for a matched pair.
    pub fn pending(record: InputRecord, enriched: EnrichedRecord, confidence: MatchConfidence) -> Self {
        Self {
            record,
            enriched,
            status: ApplyStatus::Pending,
            fields_updated: Vec::new(),
            confidence,
            error: None,
        }
    }

    /// Produces a new pending unit from a failed one.
    ///
    /// Unit status never moves backwards; re-attempting a failed apply is an
    /// explicit caller action that creates a new unit.
    pub fn into_retry(self) -> Self {
        Self::pending(self.record, self.enriched, self.confidence)
    }
}

/// One page of enriched results.
#[derive(Debug, Clone, Default)]
pub struct ResultsPage {
    pub leads: Vec<EnrichedRecord>,
    pub has_next: bool,
}

/// Fields for a subordinate contact created from a discovered person.
#[derive(Debug, Clone, Serialize)]
pub struct NewContact {
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}
