//! # Result Paginator
//!
//! Walks every results page of a completed job and returns the full enriched
//! set. Any failure abandons the whole fetch; a silently-incomplete result
//! set would let the matcher reconcile against partial data, which is worse
//! than an explicit error.

use crate::errors::EnrichError;
use crate::providers::EnrichmentEngine;
use crate::types::EnrichedRecord;
use tracing::debug;

/// Default number of result rows requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Fetches all pages for `job_id`, in order, until the engine reports no
/// further page.
pub async fn fetch_all(
    engine: &dyn EnrichmentEngine,
    job_id: &str,
    page_size: u32,
) -> Result<Vec<EnrichedRecord>, EnrichError> {
    let mut results = Vec::new();
    let mut page = 1;

    loop {
        let fetched = engine.fetch_page(job_id, page, page_size).await?;
        debug!(
            "[fetch_all] Job '{job_id}' page {page}: {} row(s), has_next={}",
            fetched.leads.len(),
            fetched.has_next
        );
        results.extend(fetched.leads);
        if !fetched.has_next {
            break;
        }
        page += 1;
    }

    Ok(results)
}
