use thiserror::Error;

/// Custom error types for the enrichment workflow.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Transport failure talking to a remote API: {0}")]
    Transport(String),
    #[error("The enrichment engine returned an error: {0}")]
    Api(String),
    #[error("Failed to deserialize a remote API response: {0}")]
    Deserialization(reqwest::Error),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("The run was cancelled by the caller")]
    Cancelled,
}

impl EnrichError {
    /// Maps a reqwest send/connect failure into the transport variant.
    ///
    /// All network-level failures funnel through here so the poll layer can
    /// treat them uniformly as retryable.
    pub fn transport(err: reqwest::Error) -> Self {
        EnrichError::Transport(err.to_string())
    }
}
