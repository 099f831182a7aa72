//! # Record Matcher Tests
//!
//! Covers the deterministic reconciliation chain: correlation id first,
//! then case-insensitive name, then position, then first-record fallback.

use leadflow::matcher::reconcile;
use leadflow::types::{ApplyStatus, EnrichedRecord, MatchConfidence};
use leadflow_test_utils::{enriched_for, record};
use serde_json::json;

#[test]
fn test_every_result_produces_exactly_one_unit() {
    let records = vec![record("1", "Acme"), record("2", "Globex"), record("3", "Initech")];
    let enriched = vec![enriched_for("1"), enriched_for("2"), enriched_for("3")];

    let units = reconcile(&records, enriched);

    assert_eq!(units.len(), 3);
    for (unit, expected_id) in units.iter().zip(["1", "2", "3"]) {
        assert_eq!(unit.record.id, expected_id);
        assert_eq!(unit.status, ApplyStatus::Pending);
        assert!(unit.fields_updated.is_empty());
        assert_eq!(unit.confidence, MatchConfidence::Id);
    }
}

#[test]
fn test_correlation_id_wins_over_name_match() {
    // The result's id points at record A while its name matches record B.
    let records = vec![record("a", "Alpha Labs"), record("b", "Beta Corp")];
    let enriched = vec![EnrichedRecord {
        name: Some("Beta Corp".to_string()),
        extra: Some(json!({ "record_id": "a" })),
        ..Default::default()
    }];

    let units = reconcile(&records, enriched);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].record.id, "a");
    assert_eq!(units[0].confidence, MatchConfidence::Id);
}

#[test]
fn test_numeric_correlation_id_is_normalized() {
    // The transport layer may turn "7" into the number 7; matching must
    // tolerate the drift.
    let records = vec![record("7", "Acme")];
    let enriched = vec![EnrichedRecord {
        extra: Some(json!({ "record_id": 7 })),
        ..Default::default()
    }];

    let units = reconcile(&records, enriched);

    assert_eq!(units[0].record.id, "7");
    assert_eq!(units[0].confidence, MatchConfidence::Id);
}

#[test]
fn test_name_match_is_case_insensitive() {
    let records = vec![record("1", "Acme"), record("2", "Globex Industries")];
    let enriched = vec![EnrichedRecord {
        name: Some("GLOBEX industries".to_string()),
        ..Default::default()
    }];

    let units = reconcile(&records, enriched);

    assert_eq!(units[0].record.id, "2");
    assert_eq!(units[0].confidence, MatchConfidence::Name);
}

#[test]
fn test_name_match_skips_already_matched_records() {
    // Two results with the same name: the second must not steal the record
    // the first already claimed; it pairs by position instead.
    let records = vec![record("1", "Acme"), record("2", "Acme")];
    let enriched = vec![
        EnrichedRecord {
            name: Some("Acme".to_string()),
            ..Default::default()
        },
        EnrichedRecord {
            name: Some("Acme".to_string()),
            ..Default::default()
        },
    ];

    let units = reconcile(&records, enriched);

    assert_eq!(units[0].record.id, "1");
    assert_eq!(units[0].confidence, MatchConfidence::Name);
    assert_eq!(units[1].record.id, "2");
    assert_eq!(units[1].confidence, MatchConfidence::Name);
}

#[test]
fn test_positional_pairing_when_nothing_else_matches() {
    let records = vec![record("1", "Acme"), record("2", "Globex")];
    let enriched = vec![EnrichedRecord::default(), EnrichedRecord::default()];

    let units = reconcile(&records, enriched);

    assert_eq!(units[0].record.id, "1");
    assert_eq!(units[1].record.id, "2");
    assert!(units.iter().all(|u| u.confidence == MatchConfidence::Position));
}

#[test]
fn test_first_record_fallback_for_out_of_range_results() {
    // More results than records: the extra row still gets a unit.
    let records = vec![record("1", "Acme")];
    let enriched = vec![EnrichedRecord::default(), EnrichedRecord::default()];

    let units = reconcile(&records, enriched);

    assert_eq!(units.len(), 2);
    assert_eq!(units[1].record.id, "1");
    assert_eq!(units[1].confidence, MatchConfidence::Fallback);
}

#[test]
fn test_empty_batch_yields_no_units() {
    let units = reconcile(&[], vec![EnrichedRecord::default()]);
    assert!(units.is_empty());
}
