//! Live event records delivered by the events API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EventId, Timestamp};

/// Kind of observation carried by a [`LiveEvent`].
///
/// Known tags get their own variant; anything else a sensor emits is kept
/// verbatim in [`EventType::Other`] so it survives a round trip.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Network connection record (`conn`).
    Connection,
    /// Name resolution record (`dns`).
    NameResolution,
    /// Detection alert (`alert`).
    Alert,
    /// Any other source-defined tag.
    Other(String),
}

impl EventType {
    /// Wire tag for this event type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connection => "conn",
            Self::NameResolution => "dns",
            Self::Alert => "alert",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "conn" | "connection" => Self::Connection,
            "dns" => Self::NameResolution,
            "alert" => Self::Alert,
            _ => Self::Other(tag),
        }
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        match kind {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.as_str())
    }
}

/// One record of the live event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    /// Stable identifier, unique per logical event.
    pub id: EventId,
    /// When the event was recorded at the source (not arrival time).
    pub timestamp: Timestamp,
    /// Kind of observation.
    pub event_type: EventType,
    /// Producer identifier (sensor or engine name).
    pub source: String,
    /// Opaque structured data; never interpreted by livewatch.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LiveEvent {
    /// Create an event with an empty (`null`) payload.
    pub fn new(
        id: impl Into<EventId>,
        timestamp: Timestamp,
        event_type: EventType,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            event_type,
            source: source.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
