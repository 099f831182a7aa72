pub mod crm;
pub mod engine;

pub use crm::{CrmApi, HttpCrmApi};
pub use engine::{EnrichmentEngine, HttpEnrichmentEngine};
