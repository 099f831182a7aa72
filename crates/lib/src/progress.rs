//! # Job Progress Tracker
//!
//! Drives the poll loop for one submitted job: a fixed-interval timer, one
//! poll per tick, snapshots streamed to the caller, and a single terminal
//! snapshot returned when the job finishes. A failed poll is tolerated and
//! retried on the next tick; a single bad poll must never abort the workflow.

use crate::cancel::CancelToken;
use crate::errors::EnrichError;
use crate::providers::EnrichmentEngine;
use crate::types::JobSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default spacing between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Polls one job to completion.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    engine: Arc<dyn EnrichmentEngine>,
    interval: Duration,
}

impl ProgressTracker {
    pub fn new(engine: Arc<dyn EnrichmentEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Runs the poll loop until the job reaches a terminal status or the
    /// caller cancels.
    ///
    /// Every successful poll is forwarded on `snapshots` (a closed receiver
    /// is tolerated); the terminal snapshot is also the return value, emitted
    /// exactly once. The interval timer lives on this function's stack, so it
    /// is torn down on every exit path. `MissedTickBehavior::Skip` drops
    /// ticks that fire while a poll is still in flight instead of queueing
    /// them, and the awaited poll call keeps at most one request in flight.
    pub async fn track(
        &self,
        job_id: &str,
        cancel: &CancelToken,
        snapshots: mpsc::Sender<JobSnapshot>,
    ) -> Result<JobSnapshot, EnrichError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                info!("[track] Polling of job '{job_id}' cancelled by caller");
                return Err(EnrichError::Cancelled);
            }

            let snapshot = match self.engine.poll(job_id).await {
                Ok(snapshot) => snapshot,
                Err(EnrichError::Transport(message)) => {
                    // Transient; try again on the next tick.
                    warn!("[track] Poll of job '{job_id}' failed, will retry: {message}");
                    continue;
                }
                Err(err) => return Err(err),
            };

            debug!(
                "[track] Job '{job_id}': {:?}, {} processed ({:.0}%)",
                snapshot.status, snapshot.processed, snapshot.progress_percent
            );
            let terminal = snapshot.status.is_terminal();
            // The caller may have stopped listening; that must not stop the poll.
            let _ = snapshots.send(snapshot.clone()).await;

            if terminal {
                info!(
                    "[track] Job '{job_id}' reached terminal status {:?}",
                    snapshot.status
                );
                return Ok(snapshot);
            }
        }
    }
}
