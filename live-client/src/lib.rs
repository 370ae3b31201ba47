//! # live-client
//!
//! Live sync controller for the livewatch event stream.
//!
//! This is the library a front end uses to keep a bounded, deduplicated view
//! of a remote event stream fresh.
//!
//! ## Features
//!
//! - **Incremental polling**: only asks for events newer than what is retained
//! - **Failure containment**: backs off after repeated failures, user-recoverable
//! - **Pluggable effects**: [`EventSource`] and [`Scheduler`] traits (HTTP/tokio, mock/manual)
//! - **Pure State Machine**: Uses live-core for side-effect-free logic
//! - **Notifications**: bounded, self-expiring [`NotificationBroadcaster`]
//!
//! ## Example
//!
//! ```ignore
//! use livewatch_client::{HttpEventSource, IntervalScheduler, LiveConfig, SyncController};
//!
//! let config = LiveConfig::default();
//! let source = HttpEventSource::from_config(&config.api)?;
//! let controller = SyncController::new(source, IntervalScheduler::new(), config.policy());
//! controller.start().await;
//!
//! let mut status = controller.subscribe();
//! while status.changed().await.is_ok() {
//!     println!("{:?}", status.borrow().phase);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod broadcaster;
pub mod config;
pub mod controller;
pub mod scheduler;
pub mod transport;

pub use broadcaster::{NotificationBroadcaster, Subscription};
pub use config::{ApiConfig, ConfigError, LiveConfig, NotificationConfig, SyncConfig};
pub use controller::{PollOutcome, SyncController, SyncStatus};
pub use scheduler::{IntervalScheduler, ManualScheduler, OnTick, Scheduler};
pub use transport::{EventSource, HttpEventSource, MockEventSource, TransportError};
