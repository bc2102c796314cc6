//! Backend Health Probe
//!
//! The chat backend serves `GET /health` on the same host as its WebSocket
//! endpoint. The probe derives the HTTP base from the WebSocket base URL
//! (`ws` becomes `http`, `wss` becomes `https`, the path is dropped) and
//! reports the backend's status and active session count.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default probe timeout
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a health probe
#[derive(Debug, Error)]
pub enum HealthError {
    /// The WebSocket base URL could not be turned into an HTTP URL
    #[error("Cannot derive health URL from {0:?}")]
    InvalidBaseUrl(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Request did not complete
    #[error("Health request failed: {0}")]
    RequestFailed(String),

    /// Backend answered with a non-success status
    #[error("Backend returned HTTP {0}")]
    BadStatus(u16),

    /// Body was not the expected JSON
    #[error("Invalid health response: {0}")]
    InvalidResponse(String),
}

/// Body of `GET /health`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Backend status string ("healthy")
    pub status: String,
    /// Conversations the backend currently holds
    #[serde(default)]
    pub active_sessions: u64,
}

impl HealthStatus {
    /// Whether the backend reports itself healthy
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// `ws://host:port/any/path` to `http://host:port/health`
///
/// # Errors
///
/// Returns [`HealthError::InvalidBaseUrl`] for schemes other than `ws` and
/// `wss`, or a missing host.
pub fn health_url(ws_base: &str) -> Result<String, HealthError> {
    let (scheme, rest) = if let Some(rest) = ws_base.strip_prefix("wss://") {
        ("https", rest)
    } else if let Some(rest) = ws_base.strip_prefix("ws://") {
        ("http", rest)
    } else {
        return Err(HealthError::InvalidBaseUrl(ws_base.to_string()));
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if authority.is_empty() {
        return Err(HealthError::InvalidBaseUrl(ws_base.to_string()));
    }

    Ok(format!("{scheme}://{authority}/health"))
}

/// HTTP health probe for the chat backend
pub struct HealthProbe {
    url: String,
    client: reqwest::Client,
}

impl HealthProbe {
    /// Build a probe for the backend behind `ws_base`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be derived or the HTTP client
    /// cannot be built.
    pub fn new(ws_base: &str) -> Result<Self, HealthError> {
        let url = health_url(ws_base)?;
        let client = reqwest::Client::builder()
            .timeout(HEALTH_TIMEOUT)
            .build()
            .map_err(|e| HealthError::Client(e.to_string()))?;
        Ok(Self { url, client })
    }

    /// The URL this probe requests
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query the backend once
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the status is not a success,
    /// or the body is not a health document.
    pub async fn check(&self) -> Result<HealthStatus, HealthError> {
        tracing::debug!(url = %self.url, "Checking backend health");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| HealthError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HealthError::BadStatus(status.as_u16()));
        }

        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| HealthError::InvalidResponse(e.to_string()))
    }
}
