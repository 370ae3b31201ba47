//! Bounded notification list.
//!
//! Newest first. Publishing past capacity drops the oldest entries.
//! Expiry is computed against an explicit `now` so the list stays pure;
//! the broadcaster in `live-client` owns the timers.

use std::collections::VecDeque;
use std::time::Duration;

use livewatch_types::{Notification, NotificationId, Timestamp};

/// Notifications currently shown, newest first.
#[derive(Debug, Clone)]
pub struct NotificationList {
    capacity: usize,
    items: VecDeque<Notification>,
}

impl NotificationList {
    /// Create an empty list holding at most `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Prepend a notification, returning any entries pushed out by capacity.
    pub fn push(&mut self, notification: Notification) -> Vec<Notification> {
        self.items.push_front(notification);
        let mut dropped = Vec::new();
        while self.items.len() > self.capacity {
            if let Some(oldest) = self.items.pop_back() {
                dropped.push(oldest);
            }
        }
        dropped
    }

    /// Remove a notification by id. Returns whether it was present.
    pub fn remove(&mut self, id: &NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != *id);
        self.items.len() != before
    }

    /// Remove every notification created at or before `now - ttl`.
    pub fn expire(&mut self, now: Timestamp, ttl: Duration) -> Vec<NotificationId> {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return Vec::new();
        };
        let cutoff = now - ttl;
        let expired: Vec<_> = self
            .items
            .iter()
            .filter(|n| n.created_at <= cutoff)
            .map(|n| n.id)
            .collect();
        self.items.retain(|n| n.created_at > cutoff);
        expired
    }

    /// Check whether a notification is present.
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.items.iter().any(|n| n.id == *id)
    }

    /// Copy out the list, newest first.
    pub fn to_vec(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    /// Number of notifications held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of notifications held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NotificationList {
    fn default() -> Self {
        Self::new(crate::DEFAULT_NOTIFICATION_CAPACITY)
    }
}
