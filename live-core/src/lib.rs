//! # live-core
//!
//! Pure logic for livewatch (no I/O, instant tests).
//!
//! This crate implements the state machine and data structures that keep a
//! live view of a remote event stream consistent, without any network or
//! timer I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (HTTP, timers) is performed by `live-client`, which
//! interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod cursor;
pub mod notify;
pub mod policy;
pub mod state;

pub use buffer::{EventBuffer, MergeReport};
pub use cursor::{WatermarkMove, WatermarkTracker};
pub use notify::NotificationList;
pub use policy::{
    SyncPolicy, DEFAULT_BUFFER_CAPACITY, DEFAULT_DISMISS_AFTER, DEFAULT_FAILURE_THRESHOLD,
    DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL,
};
pub use state::{Action, Event, Phase, SyncEvent, SyncState};
