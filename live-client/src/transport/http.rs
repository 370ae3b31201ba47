//! HTTP event source backed by reqwest.

use super::{EventSource, TransportError};
use async_trait::async_trait;
use livewatch_types::{EventsQuery, EventsResponse, LiveEvent};
use std::time::Duration;

use crate::config::ApiConfig;

/// Upper bound on a single `GET /events`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on a `GET /health` probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Client for the events API.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    base_url: String,
    http: reqwest::Client,
    health_timeout: Duration,
}

impl HttpEventSource {
    /// Create a source for the API rooted at `base_url` with default timeouts.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeouts(base_url, DEFAULT_REQUEST_TIMEOUT, DEFAULT_HEALTH_TIMEOUT)
    }

    /// Create a source from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> Result<Self, TransportError> {
        Self::with_timeouts(
            &config.base_url,
            config.request_timeout(),
            config.health_timeout(),
        )
    }

    /// Create a source with explicit timeouts.
    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            health_timeout,
        })
    }

    /// Get the base URL (without trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the events endpoint.
    pub fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    /// URL of the health endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_events(&self, query: &EventsQuery) -> Result<Vec<LiveEvent>, TransportError> {
        let url = self.events_url();
        let response = self
            .http
            .get(&url)
            .query(&query.to_query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let parsed =
            EventsResponse::from_bytes(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(parsed.events)
    }

    async fn check_health(&self) -> bool {
        let url = self.health_url();
        match self
            .http
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                tracing::debug!(status = %response.status(), "health probe answered");
                ok
            }
            Err(e) => {
                tracing::debug!("health probe failed: {}", e);
                false
            }
        }
    }
}
