//! # Progress Tracker Tests
//!
//! Covers snapshot streaming, transient poll-failure tolerance, terminal
//! handling, and cooperative cancellation.

mod common;

use leadflow::cancel::CancelToken;
use leadflow::errors::EnrichError;
use leadflow::progress::ProgressTracker;
use leadflow::types::JobStatus;
use leadflow_test_utils::{snapshot, MockEngine, PollStep};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn tracker(engine: &MockEngine) -> ProgressTracker {
    // A short interval keeps the tests fast; the loop behavior is identical.
    ProgressTracker::new(Arc::new(engine.clone()), Duration::from_millis(5))
}

#[tokio::test]
async fn test_snapshots_stream_in_order_until_terminal() {
    // --- Arrange ---
    common::setup_tracing();
    let engine = MockEngine::new();
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Processing, 10)));
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Processing, 20)));
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Completed, 30)));
    let (tx, mut rx) = mpsc::channel(16);

    // --- Act ---
    let terminal = tracker(&engine)
        .track("job-1", &CancelToken::new(), tx)
        .await
        .expect("tracking should finish");

    // --- Assert ---
    assert_eq!(terminal.status, JobStatus::Completed);
    assert_eq!(terminal.processed, 30);

    let mut seen = Vec::new();
    while let Ok(s) = rx.try_recv() {
        seen.push(s.processed);
    }
    assert_eq!(seen, vec![10, 20, 30]);
    // Progress monotonicity: processed never decreases across snapshots.
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(engine.poll_count(), 3);
}

#[tokio::test]
async fn test_transient_poll_failure_is_swallowed_and_retried() {
    let engine = MockEngine::new();
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Processing, 5)));
    engine.push_poll(PollStep::TransportError("connection reset".to_string()));
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Completed, 9)));
    let (tx, mut rx) = mpsc::channel(16);

    let terminal = tracker(&engine)
        .track("job-1", &CancelToken::new(), tx)
        .await
        .expect("one failed poll must not abort tracking");

    assert_eq!(terminal.status, JobStatus::Completed);
    // The failed tick emitted nothing; only the two good polls came through.
    let mut seen = Vec::new();
    while let Ok(s) = rx.try_recv() {
        seen.push(s.processed);
    }
    assert_eq!(seen, vec![5, 9]);
    assert_eq!(engine.poll_count(), 3);
}

#[tokio::test]
async fn test_failed_terminal_status_stops_the_loop() {
    let engine = MockEngine::new();
    let mut failed = snapshot(JobStatus::Failed, 2);
    failed.errors = vec!["provider quota exhausted".to_string()];
    engine.push_poll(PollStep::Snapshot(failed));
    let (tx, _rx) = mpsc::channel(16);

    let terminal = tracker(&engine)
        .track("job-1", &CancelToken::new(), tx)
        .await
        .expect("a failed job is still a terminal snapshot");

    assert_eq!(terminal.status, JobStatus::Failed);
    assert_eq!(terminal.errors, vec!["provider quota exhausted"]);
    assert_eq!(engine.poll_count(), 1);
}

#[tokio::test]
async fn test_cancellation_stops_polling_between_ticks() {
    let engine = MockEngine::new();
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Processing, 1)));
    let cancel = CancelToken::new();
    cancel.cancel();
    let (tx, _rx) = mpsc::channel(16);

    let result = tracker(&engine).track("job-1", &cancel, tx).await;

    assert!(matches!(result, Err(EnrichError::Cancelled)));
    // Cancelled before the first tick's poll was scheduled.
    assert_eq!(engine.poll_count(), 0);
}

#[tokio::test]
async fn test_dropped_receiver_does_not_stop_tracking() {
    let engine = MockEngine::new();
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Processing, 1)));
    engine.push_poll(PollStep::Snapshot(snapshot(JobStatus::Completed, 2)));
    let (tx, rx) = mpsc::channel(16);
    drop(rx);

    let terminal = tracker(&engine)
        .track("job-1", &CancelToken::new(), tx)
        .await
        .expect("a disinterested caller must not break the poll loop");

    assert_eq!(terminal.status, JobStatus::Completed);
}
