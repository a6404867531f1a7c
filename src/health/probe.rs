//! Health probe against the monitored service.
//!
//! # Responsibilities
//! - GET the configured health endpoint with a hard deadline
//! - Classify the answer as healthy or as a described failure
//!
//! # Design Decisions
//! - Unreachable, timeout, non-2xx and malformed bodies are all failures
//! - A well-formed body reporting anything but "ok" is a failure too,
//!   carrying the service's own error text
//! - No retries inside a probe; the watcher counts failures across ticks

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::time;
use url::Url;

use crate::config::ProbeConfig;

/// Why a probe did not come back healthy.
///
/// The `Display` text is what gets recorded as `last_error`.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("invalid probe url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("probe timeout after {0}ms")]
    Timeout(u64),

    #[error("probe unreachable: {0}")]
    Unreachable(String),

    #[error("probe returned HTTP {0}")]
    BadStatus(u16),

    #[error("malformed health response: {0}")]
    Malformed(String),

    #[error("probe client unavailable: {0}")]
    Client(String),

    /// The service answered but reported itself unhealthy.
    #[error("{0}")]
    Reported(String),
}

/// Body expected from the probed endpoint.
#[derive(Debug, Deserialize)]
struct ProbeBody {
    status: String,
    #[serde(default)]
    last_error: Option<String>,
}

/// Build the probe URL from base, port and path.
pub fn probe_url(config: &ProbeConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&config.base_url)?;
    if url.cannot_be_a_base() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
    }
    url.set_port(Some(config.port))
        .map_err(|_| url::ParseError::InvalidPort)?;
    url.set_path(&config.path);
    Ok(url)
}

/// HTTP health probe.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
}

impl HealthProbe {
    /// Build the probe's HTTP client.
    ///
    /// Fails only if the TLS backend cannot initialise.
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .no_proxy()
            .user_agent("self-heal-probe")
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Probe once. `Ok(())` means the service reported "ok".
    pub async fn check(&self, config: &ProbeConfig) -> Result<(), ProbeError> {
        let url = probe_url(config)?;
        let body = match time::timeout(config.timeout(), self.fetch(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(ProbeError::Timeout(config.timeout_ms)),
        };

        if body.status.trim().eq_ignore_ascii_case("ok") {
            return Ok(());
        }

        let error = body
            .last_error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| format!("status {}", body.status));
        Err(ProbeError::Reported(error))
    }

    async fn fetch(&self, url: Url) -> Result<ProbeBody, ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::BadStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProbeError::Unreachable(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ProbeError::Malformed(e.to_string()))
    }
}
