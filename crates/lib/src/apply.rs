//! # Apply Engine
//!
//! Takes pending apply units and writes their enriched values back to the
//! record store. The merge is non-destructive: a field goes into the update
//! payload only when the enriched value is non-empty after trimming AND
//! differs from the record's current value, so enrichment never blanks a
//! field and re-applying an unchanged unit produces an empty diff.
//!
//! Failures are isolated per unit; one bad record never aborts the batch.

use crate::cancel::CancelToken;
use crate::providers::CrmApi;
use crate::types::{ApplyStatus, ApplyUnit, EnrichedRecord, InputRecord, NewContact};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Caller-facing knobs for the apply phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// When set, a discovered contact person is created as a subordinate
    /// contact on the record.
    pub add_contacts: bool,
}

/// Applies enriched values to records through a [`CrmApi`].
#[derive(Debug, Clone)]
pub struct ApplyEngine {
    crm: Arc<dyn CrmApi>,
    options: ApplyOptions,
}

/// Adds `field` to the patch iff the enriched value is non-empty after
/// trimming and differs from the record's current value.
fn merge_field(
    patch: &mut Map<String, Value>,
    fields_updated: &mut Vec<String>,
    field: &str,
    enriched: Option<&str>,
    current: Option<&str>,
) {
    let Some(value) = enriched.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if current.map(str::trim) == Some(value) {
        return;
    }
    patch.insert(field.to_string(), Value::String(value.to_string()));
    fields_updated.push(field.to_string());
}

/// Computes the minimal update payload for one record.
///
/// Field-specific rules: the phone field prefers the validated normalized
/// representation over the raw value; the address field prefers the
/// provider-standardized string, and structured components propagate
/// independently.
fn build_patch(
    record: &InputRecord,
    enriched: &EnrichedRecord,
) -> (Map<String, Value>, Vec<String>) {
    let mut patch = Map::new();
    let mut fields = Vec::new();

    merge_field(
        &mut patch,
        &mut fields,
        "email",
        enriched.email.as_deref(),
        record.email.as_deref(),
    );

    let phone = enriched
        .phone_normalized
        .as_deref()
        .or(enriched.phone.as_deref());
    merge_field(&mut patch, &mut fields, "phone", phone, record.phone.as_deref());

    let address = enriched
        .formatted_address
        .as_deref()
        .or(enriched.address.as_deref());
    merge_field(
        &mut patch,
        &mut fields,
        "address",
        address,
        record.address.as_deref(),
    );
    merge_field(
        &mut patch,
        &mut fields,
        "city",
        enriched.city.as_deref(),
        record.city.as_deref(),
    );
    merge_field(
        &mut patch,
        &mut fields,
        "state",
        enriched.state.as_deref(),
        record.state.as_deref(),
    );
    merge_field(
        &mut patch,
        &mut fields,
        "country",
        enriched.country.as_deref(),
        record.country.as_deref(),
    );
    merge_field(
        &mut patch,
        &mut fields,
        "postal_code",
        enriched.postal_code.as_deref(),
        record.postal_code.as_deref(),
    );

    (patch, fields)
}

/// Builds the subordinate contact from a discovered person: first token of
/// the name becomes the first name and the remainder the last name, falling
/// back to the company name when no contact name was discovered.
fn build_contact(record: &InputRecord, enriched: &EnrichedRecord) -> NewContact {
    let name = enriched
        .contact_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let (first_name, last_name) = match name {
        Some(name) => match name.split_once(char::is_whitespace) {
            Some((first, rest)) => (first.to_string(), Some(rest.trim().to_string())),
            None => (name.to_string(), None),
        },
        None => (record.name.clone(), None),
    };

    NewContact {
        first_name,
        last_name,
        title: enriched
            .contact_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
    }
}

fn has_discovered_contact(enriched: &EnrichedRecord) -> bool {
    let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    filled(&enriched.contact_name) || filled(&enriched.contact_title)
}

impl ApplyEngine {
    pub fn new(crm: Arc<dyn CrmApi>, options: ApplyOptions) -> Self {
        Self { crm, options }
    }

    /// Applies one unit, transitioning it `pending -> applied` or
    /// `pending -> error`. Calling it on a non-pending unit is a no-op.
    ///
    /// A unit with an empty diff still becomes `applied`; the update call is
    /// skipped so the payload stays minimal. A failed contact creation is
    /// non-fatal: the unit is still `applied`, it just omits `"contact"`
    /// from its updated fields.
    pub async fn apply_one(&self, unit: &mut ApplyUnit) {
        if unit.status != ApplyStatus::Pending {
            debug!(
                "[apply_one] Record '{}' is already {:?}, skipping",
                unit.record.id, unit.status
            );
            return;
        }

        let (patch, mut fields) = build_patch(&unit.record, &unit.enriched);

        if !patch.is_empty() {
            if let Err(err) = self.crm.update_record(&unit.record.id, &patch).await {
                warn!("[apply_one] Update of record '{}' failed: {err}", unit.record.id);
                unit.status = ApplyStatus::Error;
                unit.error = Some(err.to_string());
                return;
            }
        }

        if self.options.add_contacts && has_discovered_contact(&unit.enriched) {
            let contact = build_contact(&unit.record, &unit.enriched);
            match self.crm.create_contact(&unit.record.id, &contact).await {
                Ok(()) => fields.push("contact".to_string()),
                Err(err) => {
                    // Non-fatal: the record update already succeeded.
                    warn!(
                        "[apply_one] Contact creation for record '{}' failed: {err}",
                        unit.record.id
                    );
                }
            }
        }

        unit.fields_updated = fields;
        unit.status = ApplyStatus::Applied;
        debug!(
            "[apply_one] Record '{}' applied with {} field(s)",
            unit.record.id,
            unit.fields_updated.len()
        );
    }

    /// Applies every pending unit, strictly in order and one at a time, so
    /// the downstream API sees no bursts and the applied-so-far counter is
    /// deterministic. Safe to call again after a partial failure: units that
    /// already reached a terminal status are left untouched.
    ///
    /// The cancel token is checked between units; an in-flight apply always
    /// runs to completion. Returns the number of units applied this call.
    pub async fn apply_all(&self, units: &mut [ApplyUnit], cancel: &CancelToken) -> usize {
        let mut applied = 0;

        for unit in units.iter_mut() {
            if cancel.is_cancelled() {
                info!("[apply_all] Cancelled after {applied} unit(s); the rest stay pending");
                break;
            }
            if unit.status != ApplyStatus::Pending {
                continue;
            }
            self.apply_one(unit).await;
            if unit.status == ApplyStatus::Applied {
                applied += 1;
            }
            info!("[apply_all] {applied} record(s) applied so far");
        }

        applied
    }
}
