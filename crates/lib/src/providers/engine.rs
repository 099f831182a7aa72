//! # Enrichment Engine Client
//!
//! A typed transport wrapper around the external enrichment engine: submit a
//! batch, poll a job, fetch one results page. No retry, backoff, or business
//! logic lives here; callers decide what is retryable.
//!
//! The engine's wire format is loosely typed (identifiers and counters drift
//! between strings and numbers across deployments), so every response is
//! normalized into the strict shapes from [`crate::types`] before it leaves
//! this module.

use crate::errors::EnrichError;
use crate::types::{
    EnrichField, EnrichedRecord, EnrichmentMeta, EnrichmentRequest, FieldValidation, InputRecord,
    JobSnapshot, JobStatus, ProviderStrategy, ResultsPage, VerificationLevel, CORRELATION_KEY,
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::debug;

/// The contract for the external enrichment engine.
#[async_trait]
pub trait EnrichmentEngine: Send + Sync + Debug {
    /// Submits a batch and returns the opaque job id.
    async fn submit(&self, request: &EnrichmentRequest) -> Result<String, EnrichError>;

    /// Fetches the current progress snapshot for a job.
    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, EnrichError>;

    /// Fetches one page of results for a completed job.
    async fn fetch_page(
        &self,
        job_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ResultsPage, EnrichError>;
}

// --- Wire shapes ---

#[derive(Serialize)]
struct SubmitRecord<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    extra: Value,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    records: Vec<SubmitRecord<'a>>,
    fields: &'a [EnrichField],
    strategy: ProviderStrategy,
    providers: &'a [String],
    verification: VerificationLevel,
    skip_filled: bool,
    chunk_size: u32,
}

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct RawStatus {
    status: JobStatus,
    #[serde(default)]
    processed: Value,
    #[serde(default)]
    enriched: Value,
    #[serde(default)]
    failed: Value,
    #[serde(default)]
    skipped: Value,
    #[serde(default)]
    current_chunk: Value,
    #[serde(default)]
    total_chunks: Value,
    #[serde(default)]
    progress_percent: Value,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Deserialize)]
struct RawLead {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Value,
    #[serde(default)]
    phone_normalized: Value,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    postal_code: Value,
    #[serde(default)]
    contact_name: Option<String>,
    #[serde(default)]
    contact_title: Option<String>,
    #[serde(default)]
    sources: HashMap<String, String>,
    #[serde(default)]
    validation: HashMap<String, FieldValidation>,
    #[serde(default)]
    extra: Option<Value>,
    #[serde(default)]
    meta: EnrichmentMeta,
}

#[derive(Deserialize)]
struct RawPagination {
    #[serde(default)]
    has_next: bool,
}

#[derive(Deserialize)]
struct ResultsResponse {
    #[serde(default)]
    leads: Vec<RawLead>,
    #[serde(default)]
    pagination: Option<RawPagination>,
}

// --- Normalization helpers ---

/// Coerces a loosely-typed counter (number, numeric string, or absent) to u64.
fn value_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn value_u32(value: &Value) -> u32 {
    value_u64(value) as u32
}

fn value_f32(value: &Value) -> f32 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0) as f32,
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Coerces a string-or-number field to a non-empty string.
fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawStatus {
    fn into_snapshot(self, job_id: &str) -> JobSnapshot {
        JobSnapshot {
            job_id: job_id.to_string(),
            status: self.status,
            processed: value_u64(&self.processed),
            enriched: value_u64(&self.enriched),
            failed: value_u64(&self.failed),
            skipped: value_u64(&self.skipped),
            current_chunk: value_u32(&self.current_chunk),
            total_chunks: value_u32(&self.total_chunks),
            progress_percent: value_f32(&self.progress_percent),
            errors: self.errors,
        }
    }
}

impl RawLead {
    fn into_record(self) -> EnrichedRecord {
        EnrichedRecord {
            name: self.name,
            website: self.website,
            email: self.email,
            phone: value_string(&self.phone),
            phone_normalized: value_string(&self.phone_normalized),
            address: self.address,
            formatted_address: self.formatted_address,
            city: self.city,
            state: self.state,
            country: self.country,
            postal_code: value_string(&self.postal_code),
            contact_name: self.contact_name,
            contact_title: self.contact_title,
            sources: self.sources,
            validation: self.validation,
            extra: self.extra,
            meta: self.meta,
        }
    }
}

/// Builds the correlation payload submitted with a record: the caller's
/// `extra` (if any) stamped with the record id, so the echo can be matched
/// back even when the caller supplied nothing.
fn correlation_extra(record: &InputRecord) -> Value {
    let mut extra = match &record.extra {
        Some(Value::Object(map)) => map.clone(),
        _ => serde_json::Map::new(),
    };
    extra.insert(CORRELATION_KEY.to_string(), Value::String(record.id.clone()));
    Value::Object(extra)
}

// --- HTTP implementation ---

/// A reqwest-backed [`EnrichmentEngine`].
#[derive(Clone, Debug)]
pub struct HttpEnrichmentEngine {
    client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEnrichmentEngine {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, EnrichError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(EnrichError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

/// Checks a response status. Server-side failures (5xx) are transport
/// conditions the caller may retry; anything else non-successful is an
/// engine rejection.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, EnrichError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        Err(EnrichError::Transport(format!("{status}: {body}")))
    } else {
        Err(EnrichError::Api(format!("{status}: {body}")))
    }
}

#[async_trait]
impl EnrichmentEngine for HttpEnrichmentEngine {
    async fn submit(&self, request: &EnrichmentRequest) -> Result<String, EnrichError> {
        let records = request
            .records
            .iter()
            .map(|r| SubmitRecord {
                id: &r.id,
                name: &r.name,
                website: r.website.as_deref(),
                email: r.email.as_deref(),
                phone: r.phone.as_deref(),
                address: r.address.as_deref(),
                extra: correlation_extra(r),
            })
            .collect();

        let body = SubmitRequest {
            records,
            fields: &request.fields,
            strategy: request.strategy,
            providers: &request.providers,
            verification: request.verification,
            skip_filled: request.skip_filled,
            chunk_size: request.chunk_size,
        };
        let response = self
            .request(reqwest::Method::POST, "/v1/enrichment/jobs")
            .json(&body)
            .send()
            .await
            .map_err(EnrichError::transport)?;

        let body: SubmitResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(EnrichError::Deserialization)?;

        debug!("[submit] Batch accepted as job '{}'", body.job_id);
        Ok(body.job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, EnrichError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/enrichment/jobs/{job_id}"),
            )
            .send()
            .await
            .map_err(EnrichError::transport)?;

        let raw: RawStatus = check_status(response)
            .await?
            .json()
            .await
            .map_err(EnrichError::Deserialization)?;

        Ok(raw.into_snapshot(job_id))
    }

    async fn fetch_page(
        &self,
        job_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ResultsPage, EnrichError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/v1/enrichment/jobs/{job_id}/results"),
            )
            .query(&[("page", page), ("page_size", page_size)])
            .send()
            .await
            .map_err(EnrichError::transport)?;

        let body: ResultsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(EnrichError::Deserialization)?;

        Ok(ResultsPage {
            leads: body.leads.into_iter().map(RawLead::into_record).collect(),
            has_next: body.pagination.map(|p| p.has_next).unwrap_or(false),
        })
    }
}
