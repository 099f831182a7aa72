//! # Result Paginator Tests

use leadflow::errors::EnrichError;
use leadflow::paginate::fetch_all;
use leadflow_test_utils::{enriched_for, MockEngine};

#[tokio::test]
async fn test_all_pages_are_concatenated_in_order() {
    // --- Arrange ---
    let engine = MockEngine::new();
    engine.set_pages(vec![
        vec![enriched_for("1"), enriched_for("2")],
        vec![enriched_for("3"), enriched_for("4")],
        vec![enriched_for("5")],
    ]);

    // --- Act ---
    let results = fetch_all(&engine, "job-1", 2).await.expect("fetch succeeds");

    // --- Assert ---
    let ids: Vec<_> = results
        .iter()
        .map(|r| r.extra.as_ref().unwrap()["record_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_single_page_job() {
    let engine = MockEngine::new();
    engine.set_pages(vec![vec![enriched_for("1")]]);

    let results = fetch_all(&engine, "job-1", 100).await.unwrap();

    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_transport_error_abandons_the_whole_fetch() {
    // Page 1 succeeds, page 2 fails: no partial set may surface.
    let engine = MockEngine::new();
    engine.set_pages(vec![vec![enriched_for("1")], vec![enriched_for("2")]]);
    engine.fail_page(2, "gateway timeout");

    let result = fetch_all(&engine, "job-1", 1).await;

    assert!(matches!(result, Err(EnrichError::Transport(_))));
}

#[tokio::test]
async fn test_empty_result_set() {
    let engine = MockEngine::new();
    engine.set_pages(vec![Vec::new()]);

    let results = fetch_all(&engine, "job-1", 100).await.unwrap();

    assert!(results.is_empty());
}
