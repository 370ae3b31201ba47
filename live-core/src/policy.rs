//! Sync policy constants.
//!
//! These are the reference values; `live-client` lets a config file override
//! them per process.

use std::time::Duration;

/// Delay between scheduled polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Consecutive failed polls that put the controller into backoff.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Maximum events requested per poll.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Maximum events retained by the event buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 500;

/// Maximum notifications held at once.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 5;

/// Lifetime of a notification that is not dismissed.
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

/// Tunables of one sync controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Whether polling starts enabled.
    pub initial_enabled: bool,
    /// Delay between scheduled polls.
    pub poll_interval: Duration,
    /// Consecutive failures before backoff.
    pub failure_threshold: u32,
    /// Events requested per poll.
    pub page_size: u32,
    /// Events retained in memory.
    pub buffer_capacity: usize,
}

impl SyncPolicy {
    /// Set whether polling starts enabled.
    pub fn with_initial_enabled(mut self, enabled: bool) -> Self {
        self.initial_enabled = enabled;
        self
    }

    /// Set the failure threshold (clamped to at least 1).
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the buffer capacity.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            initial_enabled: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            page_size: DEFAULT_PAGE_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}
