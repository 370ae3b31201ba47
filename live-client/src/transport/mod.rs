//! Event source abstraction for livewatch.
//!
//! This module provides a pluggable retrieval layer that abstracts how
//! events reach the controller (HTTP API, mock for testing).
//!
//! # Design
//!
//! The source trait is async and stateless from the caller's view:
//! - `fetch_events()` performs one incremental `GET /events`
//! - `check_health()` probes `GET /health` and reduces it to a boolean
//!
//! # Example
//!
//! ```ignore
//! let source = MockEventSource::new();
//! source.queue_events(vec![event]);
//! let batch = source.fetch_events(&EventsQuery::new(200, None)).await?;
//! ```

mod http;
mod mock;

pub use http::{HttpEventSource, DEFAULT_HEALTH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use mock::MockEventSource;

use async_trait::async_trait;
use livewatch_types::{EventsQuery, LiveEvent};
use thiserror::Error;

/// Retrieval errors. Every variant counts as one failed poll.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The body was not a valid events response.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The configured base URL is unusable.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Source of live events.
///
/// Implementations handle the underlying retrieval mechanism
/// (HTTP, mock, etc).
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch events matching the query.
    ///
    /// Returned events may be in any order and may repeat ids already seen.
    async fn fetch_events(&self, query: &EventsQuery) -> Result<Vec<LiveEvent>, TransportError>;

    /// Check whether the backend is reachable.
    ///
    /// Never fails; any error or timeout reads as unreachable.
    async fn check_health(&self) -> bool;
}
