//! # Test Utilities
//!
//! Programmable in-memory doubles for the enrichment engine and the record
//! store, plus small builders for the fixtures the integration tests share.
//! Both mocks record their calls behind `Arc<Mutex<...>>` so assertions can
//! inspect exactly what the workflow did.

use async_trait::async_trait;
use leadflow::errors::EnrichError;
use leadflow::providers::{CrmApi, EnrichmentEngine};
use leadflow::types::{
    EnrichedRecord, EnrichmentRequest, InputRecord, JobSnapshot, JobStatus, NewContact,
    ResultsPage,
};
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

// --- Fixture builders ---

/// Builds a minimal input record with the given id and name.
pub fn record(id: &str, name: &str) -> InputRecord {
    InputRecord {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Builds a progress snapshot for `job-1` with sensible defaults.
pub fn snapshot(status: JobStatus, processed: u64) -> JobSnapshot {
    JobSnapshot {
        job_id: "job-1".to_string(),
        status,
        processed,
        enriched: processed,
        failed: 0,
        skipped: 0,
        current_chunk: 0,
        total_chunks: 1,
        progress_percent: 0.0,
        errors: Vec::new(),
    }
}

/// Builds an enriched result whose echoed extra carries `record_id`.
pub fn enriched_for(record_id: &str) -> EnrichedRecord {
    EnrichedRecord {
        extra: Some(serde_json::json!({ "record_id": record_id })),
        ..Default::default()
    }
}

// --- Mock Enrichment Engine ---

/// One scripted poll outcome.
#[derive(Clone, Debug)]
pub enum PollStep {
    Snapshot(JobSnapshot),
    TransportError(String),
}

/// A scriptable [`EnrichmentEngine`].
///
/// Poll outcomes are consumed front to back; once the script is exhausted
/// the last snapshot keeps repeating. Pages are served by index, with an
/// optional per-page transport failure.
#[derive(Clone, Debug, Default)]
pub struct MockEngine {
    pub job_id: String,
    submit_error: Arc<Mutex<Option<String>>>,
    submitted: Arc<Mutex<Vec<EnrichmentRequest>>>,
    poll_script: Arc<Mutex<VecDeque<PollStep>>>,
    last_snapshot: Arc<Mutex<Option<JobSnapshot>>>,
    poll_count: Arc<Mutex<usize>>,
    pages: Arc<Mutex<Vec<Result<ResultsPage, String>>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            job_id: "job-1".to_string(),
            ..Default::default()
        }
    }

    /// Appends one poll outcome to the script.
    pub fn push_poll(&self, step: PollStep) {
        self.poll_script.lock().unwrap().push_back(step);
    }

    /// Programs the results pages, in order. `has_next` is set automatically
    /// on all but the last page.
    pub fn set_pages(&self, pages: Vec<Vec<EnrichedRecord>>) {
        let total = pages.len();
        let mut slots = self.pages.lock().unwrap();
        *slots = pages
            .into_iter()
            .enumerate()
            .map(|(i, leads)| {
                Ok(ResultsPage {
                    leads,
                    has_next: i + 1 < total,
                })
            })
            .collect();
    }

    /// Makes fetching the given 1-based page fail with a transport error.
    pub fn fail_page(&self, page: usize, message: &str) {
        let mut slots = self.pages.lock().unwrap();
        while slots.len() < page {
            slots.push(Ok(ResultsPage::default()));
        }
        slots[page - 1] = Err(message.to_string());
    }

    pub fn fail_submit(&self, message: &str) {
        *self.submit_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn submitted(&self) -> Vec<EnrichmentRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.poll_count.lock().unwrap()
    }
}

#[async_trait]
impl EnrichmentEngine for MockEngine {
    async fn submit(&self, request: &EnrichmentRequest) -> Result<String, EnrichError> {
        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(EnrichError::Transport(message));
        }
        self.submitted.lock().unwrap().push(request.clone());
        Ok(self.job_id.clone())
    }

    async fn poll(&self, _job_id: &str) -> Result<JobSnapshot, EnrichError> {
        *self.poll_count.lock().unwrap() += 1;
        let step = self.poll_script.lock().unwrap().pop_front();
        match step {
            Some(PollStep::Snapshot(snapshot)) => {
                *self.last_snapshot.lock().unwrap() = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(PollStep::TransportError(message)) => Err(EnrichError::Transport(message)),
            None => self
                .last_snapshot
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| EnrichError::Transport("poll script exhausted".to_string())),
        }
    }

    async fn fetch_page(
        &self,
        _job_id: &str,
        page: u32,
        _page_size: u32,
    ) -> Result<ResultsPage, EnrichError> {
        let slots = self.pages.lock().unwrap();
        match slots.get(page as usize - 1) {
            Some(Ok(results)) => Ok(results.clone()),
            Some(Err(message)) => Err(EnrichError::Transport(message.clone())),
            None => Ok(ResultsPage::default()),
        }
    }
}

// --- Mock CRM ---

/// A recording [`CrmApi`] with per-record failure injection.
#[derive(Clone, Debug, Default)]
pub struct MockCrm {
    updates: Arc<Mutex<Vec<(String, Map<String, Value>)>>>,
    contacts: Arc<Mutex<Vec<(String, NewContact)>>>,
    fail_update_for: Arc<Mutex<HashSet<String>>>,
    fail_contact_for: Arc<Mutex<HashSet<String>>>,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `update_record` fail for the given record id.
    pub fn fail_update_for(&self, record_id: &str) {
        self.fail_update_for
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    /// Makes `create_contact` fail for the given record id.
    pub fn fail_contact_for(&self, record_id: &str) {
        self.fail_contact_for
            .lock()
            .unwrap()
            .insert(record_id.to_string());
    }

    /// The recorded `(record_id, patch)` update calls, in order.
    pub fn updates(&self) -> Vec<(String, Map<String, Value>)> {
        self.updates.lock().unwrap().clone()
    }

    /// The recorded `(record_id, contact)` creation calls, in order.
    pub fn contacts(&self) -> Vec<(String, NewContact)> {
        self.contacts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CrmApi for MockCrm {
    async fn update_record(
        &self,
        record_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<(), EnrichError> {
        if self.fail_update_for.lock().unwrap().contains(record_id) {
            return Err(EnrichError::Transport(format!(
                "update of '{record_id}' refused by mock"
            )));
        }
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), patch.clone()));
        Ok(())
    }

    async fn create_contact(
        &self,
        record_id: &str,
        contact: &NewContact,
    ) -> Result<(), EnrichError> {
        if self.fail_contact_for.lock().unwrap().contains(record_id) {
            return Err(EnrichError::Transport(format!(
                "contact creation for '{record_id}' refused by mock"
            )));
        }
        self.contacts
            .lock()
            .unwrap()
            .push((record_id.to_string(), contact.clone()));
        Ok(())
    }
}
