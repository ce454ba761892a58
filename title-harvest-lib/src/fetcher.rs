//! Page retrieval.
//!
//! The [`Fetcher`] trait is the seam between the coordination core and the
//! network. [`HttpFetcher`] is the production implementation; tests plug in
//! their own.

use crate::error::HarvestError;
use crate::types::HarvestConfig;
use async_trait::async_trait;
use std::time::Duration;

/// Retrieves the body of one document.
///
/// Any failure (transport error, non-2xx status, timeout) is reported as an
/// `Err`; callers treat them all the same way.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn retrieve(&self, url: &str) -> Result<String, HarvestError>;
}

/// HTTP `GET` fetcher backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpFetcher {
    /// Connection pool shared by every worker
    http_client: reqwest::Client,
    /// Opt-in request timeout, reported back in `HarvestError::Timeout`
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher with platform defaults: no timeout, default headers.
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_config(&HarvestConfig::default())
    }

    /// Create a fetcher honouring the timeout and user agent in `config`.
    pub fn with_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let http_client = builder.build().map_err(|e| {
            HarvestError::internal(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn retrieve(&self, url: &str) -> Result<String, HarvestError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::fetch_with_status(
                url,
                status.canonical_reason().unwrap_or("unsuccessful status"),
                status.as_u16(),
            ));
        }

        response.text().await.map_err(|e| self.classify(url, e))
    }
}

impl HttpFetcher {
    fn classify(&self, url: &str, err: reqwest::Error) -> HarvestError {
        match self.timeout {
            Some(duration) if err.is_timeout() => HarvestError::timeout(url, duration),
            _ if err.is_builder() => HarvestError::invalid_url(url, err.to_string()),
            _ => HarvestError::from(err),
        }
    }
}
