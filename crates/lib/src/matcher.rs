//! # Record Matcher
//!
//! Reconciles each enriched result back to the input record it came from.
//! The priority chain is deterministic and total: every enriched record
//! produces exactly one pending [`ApplyUnit`], even when neither the
//! correlation id nor the name matches. Low-confidence pairings are tagged
//! rather than rejected so callers can surface them.

use crate::types::{
    ApplyUnit, EnrichedRecord, InputRecord, MatchConfidence, CORRELATION_KEY,
};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Extracts the correlation id from an echoed `extra` payload, tolerating
/// numeric/string drift across the transport boundary.
fn correlation_id(extra: Option<&Value>) -> Option<String> {
    match extra?.get(CORRELATION_KEY)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finds the input record for one enriched result.
///
/// Priority chain, stopping at the first hit:
/// 1. exact match on the echoed correlation id,
/// 2. case-insensitive name match against a not-yet-matched record,
/// 3. positional pairing by submission index,
/// 4. the first record in the batch.
fn find_match(
    records: &[InputRecord],
    matched: &HashSet<usize>,
    enriched: &EnrichedRecord,
    position: usize,
) -> Option<(usize, MatchConfidence)> {
    if let Some(id) = correlation_id(enriched.extra.as_ref()) {
        if let Some(index) = records.iter().position(|r| r.id.trim() == id) {
            return Some((index, MatchConfidence::Id));
        }
    }

    if let Some(name) = enriched.name.as_deref() {
        let wanted = name.trim().to_lowercase();
        if !wanted.is_empty() {
            let candidate = records.iter().enumerate().find(|(i, r)| {
                !matched.contains(i) && r.name.trim().to_lowercase() == wanted
            });
            if let Some((index, _)) = candidate {
                return Some((index, MatchConfidence::Name));
            }
        }
    }

    if position < records.len() {
        return Some((position, MatchConfidence::Position));
    }

    if records.is_empty() {
        return None;
    }
    Some((0, MatchConfidence::Fallback))
}

/// Pairs every enriched result with an input record, producing one pending
/// apply unit per result.
pub fn reconcile(records: &[InputRecord], enriched: Vec<EnrichedRecord>) -> Vec<ApplyUnit> {
    let mut matched: HashSet<usize> = HashSet::new();
    let mut units = Vec::with_capacity(enriched.len());

    for (position, result) in enriched.into_iter().enumerate() {
        let Some((index, confidence)) = find_match(records, &matched, &result, position) else {
            continue;
        };
        debug!(
            "[reconcile] Result {position} matched record '{}' via {confidence:?}",
            records[index].id
        );
        matched.insert(index);
        units.push(ApplyUnit::pending(
            records[index].clone(),
            result,
            confidence,
        ));
    }

    units
}
