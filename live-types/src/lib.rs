//! # live-types
//!
//! Wire format types for the livewatch event stream.
//!
//! This crate provides the foundational types used across all livewatch crates:
//! - [`EventId`], [`NotificationId`] - Identity types
//! - [`LiveEvent`], [`EventType`] - Records delivered by the events API
//! - [`EventsQuery`], [`EventsResponse`] - Request/response shapes of `GET /events`
//! - [`Notification`], [`NotificationKind`] - Short-lived user-facing messages
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod ids;
mod messages;
mod notification;

pub use error::TypesError;
pub use event::{EventType, LiveEvent};
pub use ids::{EventId, NotificationId};
pub use messages::{EventsQuery, EventsResponse};
pub use notification::{Notification, NotificationKind};

/// Timestamp type used for every instant on the wire.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
