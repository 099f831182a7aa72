//! # Enrichment Orchestrator
//!
//! The root state machine sequencing one enrichment run:
//! `configuring -> submitting -> polling -> fetching -> reconciling ->
//! applying -> done | failed`. Each transition is logged; transport failures
//! while submitting or fetching end the run in `failed` with the message
//! retained for display. Apply failures never fail the run; they stay on
//! their units.

use crate::apply::{ApplyEngine, ApplyOptions};
use crate::cancel::CancelToken;
use crate::errors::EnrichError;
use crate::matcher;
use crate::paginate::{self, DEFAULT_PAGE_SIZE};
use crate::progress::{ProgressTracker, DEFAULT_POLL_INTERVAL};
use crate::providers::{CrmApi, EnrichmentEngine};
use crate::types::{ApplyStatus, ApplyUnit, EnrichmentRequest, JobSnapshot, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// The phases of one enrichment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Configuring,
    Submitting,
    Polling,
    Fetching,
    Reconciling,
    Applying,
    Done,
    Failed,
}

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub poll_interval: Duration,
    pub page_size: u32,
    /// Run the apply phase immediately after reconciliation instead of
    /// waiting for an explicit caller action.
    pub auto_apply: bool,
    pub apply: ApplyOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            auto_apply: false,
            apply: ApplyOptions::default(),
        }
    }
}

/// What a finished (or aborted) run looks like to the caller.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    /// One unit per enriched result, in results order.
    pub units: Vec<ApplyUnit>,
    /// The terminal job snapshot, when polling got that far.
    pub last_snapshot: Option<JobSnapshot>,
    /// Human-readable failure message when `state` is `Failed`.
    pub error: Option<String>,
    /// Set when the caller cancelled before the run finished. The state list
    /// has no cancelled member; a cancelled run keeps the last phase it
    /// reached.
    pub cancelled: bool,
}

impl RunOutcome {
    /// Units whose apply call failed.
    pub fn error_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status == ApplyStatus::Error)
            .count()
    }
}

/// Drives one enrichment job from submission to applied results.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    engine: Arc<dyn EnrichmentEngine>,
    apply_engine: ApplyEngine,
    config: OrchestratorConfig,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn EnrichmentEngine>,
        crm: Arc<dyn CrmApi>,
        config: OrchestratorConfig,
    ) -> Self {
        let apply_engine = ApplyEngine::new(crm, config.apply);
        Self {
            engine,
            apply_engine,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// The token callers use to cancel this run cooperatively.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the workflow without observing intermediate progress.
    pub async fn run(&self, request: EnrichmentRequest) -> RunOutcome {
        // Progress goes nowhere; the receiver is dropped immediately.
        let (tx, _rx) = mpsc::channel(16);
        self.run_with_progress(request, tx).await
    }

    /// Runs the workflow, forwarding every poll snapshot on `progress`.
    pub async fn run_with_progress(
        &self,
        request: EnrichmentRequest,
        progress: mpsc::Sender<JobSnapshot>,
    ) -> RunOutcome {
        let mut state = RunState::Configuring;
        info!(
            "[run] Starting enrichment run for {} record(s)",
            request.records.len()
        );

        // Submit.
        state = self.transition(state, RunState::Submitting);
        if self.cancel.is_cancelled() {
            return Self::cancelled_outcome(state);
        }
        let job_id = match self.engine.submit(&request).await {
            Ok(job_id) => job_id,
            Err(err) => return self.failed(state, None, err),
        };

        // Poll to a terminal status.
        state = self.transition(state, RunState::Polling);
        let tracker = ProgressTracker::new(self.engine.clone(), self.config.poll_interval);
        let terminal = match tracker.track(&job_id, &self.cancel, progress).await {
            Ok(snapshot) => snapshot,
            Err(EnrichError::Cancelled) => return Self::cancelled_outcome(state),
            Err(err) => return self.failed(state, None, err),
        };
        if terminal.status == JobStatus::Failed {
            let message = if terminal.errors.is_empty() {
                "enrichment job failed".to_string()
            } else {
                terminal.errors.join("; ")
            };
            error!("[run] Job '{job_id}' failed: {message}");
            return RunOutcome {
                state: RunState::Failed,
                units: Vec::new(),
                last_snapshot: Some(terminal),
                error: Some(message),
                cancelled: false,
            };
        }

        // Fetch every results page.
        state = self.transition(state, RunState::Fetching);
        if self.cancel.is_cancelled() {
            return Self::cancelled_outcome(state);
        }
        let enriched =
            match paginate::fetch_all(self.engine.as_ref(), &job_id, self.config.page_size).await {
                Ok(enriched) => enriched,
                Err(err) => return self.failed(state, Some(terminal), err),
            };

        // Reconcile results back to their records.
        state = self.transition(state, RunState::Reconciling);
        if self.cancel.is_cancelled() {
            return Self::cancelled_outcome(state);
        }
        let mut units = matcher::reconcile(&request.records, enriched);
        info!("[run] Reconciled {} apply unit(s)", units.len());

        // Apply, when configured to do so without a further caller action.
        if self.config.auto_apply && !self.cancel.is_cancelled() {
            state = self.transition(state, RunState::Applying);
            self.apply_engine.apply_all(&mut units, &self.cancel).await;
        }

        let state = self.transition(state, RunState::Done);
        RunOutcome {
            state,
            units,
            last_snapshot: Some(terminal),
            error: None,
            cancelled: self.cancel.is_cancelled(),
        }
    }

    /// Applies pending units as an explicit caller action (the non-auto-apply
    /// path, and the re-attempt path for units recreated via
    /// [`ApplyUnit::into_retry`]). Returns the number applied.
    pub async fn apply(&self, units: &mut [ApplyUnit]) -> usize {
        self.apply_engine.apply_all(units, &self.cancel).await
    }

    fn transition(&self, from: RunState, to: RunState) -> RunState {
        info!("[run] {from:?} -> {to:?}");
        to
    }

    fn failed(&self, state: RunState, snapshot: Option<JobSnapshot>, err: EnrichError) -> RunOutcome {
        let message = err.to_string();
        error!("[run] Run failed while {state:?}: {message}");
        RunOutcome {
            state: RunState::Failed,
            units: Vec::new(),
            last_snapshot: snapshot,
            error: Some(message),
            cancelled: false,
        }
    }

    fn cancelled_outcome(state: RunState) -> RunOutcome {
        info!("[run] Run cancelled while {state:?}");
        RunOutcome {
            state,
            units: Vec::new(),
            last_snapshot: None,
            error: None,
            cancelled: true,
        }
    }
}
