//! # Configuration
//!
//! Environment-driven settings for wiring up the HTTP clients and the
//! orchestrator. A `.env` file is honored when present.

use crate::apply::ApplyOptions;
use crate::errors::EnrichError;
use crate::orchestrator::OrchestratorConfig;
use std::env;
use std::time::Duration;

/// Everything needed to construct the clients and an orchestrator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the enrichment engine. From `ENRICH_API_URL`.
    pub engine_url: String,
    /// Optional bearer key for the engine. From `ENRICH_API_KEY`.
    pub engine_api_key: Option<String>,
    /// Base URL of the record store. From `CRM_API_URL`.
    pub crm_url: String,
    /// Optional bearer key for the record store. From `CRM_API_KEY`.
    pub crm_api_key: Option<String>,
    /// Seconds between job polls. From `POLL_INTERVAL_SECS`, default 3.
    pub poll_interval_secs: u64,
    /// Result rows per page. From `PAGE_SIZE`, default 100.
    pub page_size: u32,
    /// Records per engine progress increment. From `CHUNK_SIZE`, default 10.
    pub chunk_size: u32,
    /// Apply results without a further caller action. From `AUTO_APPLY`.
    pub auto_apply: bool,
    /// Create subordinate contacts for discovered people. From `ADD_CONTACTS`.
    pub add_contacts: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AppConfig {
    /// Loads the configuration from the environment.
    pub fn from_env() -> Result<Self, EnrichError> {
        dotenvy::dotenv().ok();

        let engine_url = env::var("ENRICH_API_URL")
            .map_err(|_| EnrichError::MissingConfig("ENRICH_API_URL".to_string()))?;
        let crm_url = env::var("CRM_API_URL")
            .map_err(|_| EnrichError::MissingConfig("CRM_API_URL".to_string()))?;

        Ok(Self {
            engine_url,
            engine_api_key: env::var("ENRICH_API_KEY").ok(),
            crm_url,
            crm_api_key: env::var("CRM_API_KEY").ok(),
            poll_interval_secs: env_or("POLL_INTERVAL_SECS", 3),
            page_size: env_or("PAGE_SIZE", 100),
            chunk_size: env_or("CHUNK_SIZE", 10),
            auto_apply: env_flag("AUTO_APPLY"),
            add_contacts: env_flag("ADD_CONTACTS"),
        })
    }

    /// Derives the orchestrator tunables from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            page_size: self.page_size,
            auto_apply: self.auto_apply,
            apply: ApplyOptions {
                add_contacts: self.add_contacts,
            },
        }
    }
}
