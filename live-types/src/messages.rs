//! Request and response shapes of the events API.
//!
//! `GET /events?limit=<n>&since=<RFC 3339>` returns `{"events": [...]}`.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::{LiveEvent, Timestamp, TypesError};

/// Parameters of an incremental events request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsQuery {
    /// Maximum number of events to return.
    pub limit: u32,
    /// Only return events recorded after this instant. `None` asks for the
    /// most recent page unconditionally.
    pub since: Option<Timestamp>,
}

impl EventsQuery {
    /// Create a query.
    pub fn new(limit: u32, since: Option<Timestamp>) -> Self {
        Self { limit, since }
    }

    /// Encode as URL query pairs. `since` is omitted entirely when absent.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(since) = self.since {
            pairs.push((
                "since",
                since.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ));
        }
        pairs
    }
}

/// Body of a successful `GET /events` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventsResponse {
    /// Returned events, in no guaranteed order, possibly repeating ids.
    #[serde(default)]
    pub events: Vec<LiveEvent>,
}

impl EventsResponse {
    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        serde_json::from_slice(bytes).map_err(TypesError::Deserialization)
    }
}
