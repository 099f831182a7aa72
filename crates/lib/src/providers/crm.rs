//! # Record-Update Client
//!
//! The thin transport wrapper around the caller's record-update and
//! contact-creation APIs. The apply engine builds the partial payloads; this
//! client only carries them.

use crate::errors::EnrichError;
use crate::types::NewContact;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde_json::{Map, Value};
use std::fmt::Debug;
use tracing::debug;

/// The contract for the downstream record store (CRM).
#[async_trait]
pub trait CrmApi: Send + Sync + Debug {
    /// Applies a partial update to one record. Only the keys present in
    /// `patch` are touched.
    async fn update_record(
        &self,
        record_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<(), EnrichError>;

    /// Creates a subordinate contact under a record.
    async fn create_contact(
        &self,
        record_id: &str,
        contact: &NewContact,
    ) -> Result<(), EnrichError>;
}

/// A reqwest-backed [`CrmApi`].
#[derive(Clone, Debug)]
pub struct HttpCrmApi {
    client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCrmApi {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self, EnrichError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(EnrichError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), EnrichError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(EnrichError::Transport(format!("{status}: {body}")))
}

#[async_trait]
impl CrmApi for HttpCrmApi {
    async fn update_record(
        &self,
        record_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<(), EnrichError> {
        debug!(
            "[update_record] Patching record '{record_id}' with {} field(s)",
            patch.len()
        );
        let response = self
            .request(reqwest::Method::PATCH, &format!("/v1/records/{record_id}"))
            .json(patch)
            .send()
            .await
            .map_err(EnrichError::transport)?;
        check_status(response).await
    }

    async fn create_contact(
        &self,
        record_id: &str,
        contact: &NewContact,
    ) -> Result<(), EnrichError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/records/{record_id}/contacts"),
            )
            .json(contact)
            .send()
            .await
            .map_err(EnrichError::transport)?;
        check_status(response).await
    }
}
