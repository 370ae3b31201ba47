//! Notification broadcaster.
//!
//! Keeps a short, newest-first list of user-facing notifications and tells
//! subscribers whenever it changes. Each notification removes itself after
//! the configured delay unless dismissed first.
//!
//! Subscribers are plain callbacks invoked synchronously after every
//! mutation, once the list lock has been released; they read the new list
//! through [`NotificationBroadcaster::notifications`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use livewatch_core::{NotificationList, DEFAULT_DISMISS_AFTER, DEFAULT_NOTIFICATION_CAPACITY};
use livewatch_types::{Notification, NotificationId, NotificationKind};

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Bounded, self-expiring notification list with change subscribers.
///
/// Clones share state; separately constructed broadcasters share nothing.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    list: Mutex<NotificationList>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    dismiss_after: Duration,
}

impl NotificationBroadcaster {
    /// Create a broadcaster holding at most `capacity` notifications, each
    /// removed `dismiss_after` after publication.
    pub fn new(capacity: usize, dismiss_after: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                list: Mutex::new(NotificationList::new(capacity)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                dismiss_after,
            }),
        }
    }

    /// Publish a notification. Never fails.
    ///
    /// The oldest entries are dropped past capacity. Removal after the
    /// dismiss delay needs a tokio runtime; without one the notification
    /// stays until dismissed, evicted or swept.
    pub fn publish(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: Option<String>,
    ) -> NotificationId {
        let notification = Notification::new(kind, title, message);
        let id = notification.id;
        let dropped = self.inner.lock_list().push(notification);
        if !dropped.is_empty() {
            tracing::debug!(dropped = dropped.len(), "notification list full, oldest dropped");
        }

        self.inner.notify();
        self.schedule_dismiss(id);
        id
    }

    /// Publish a success notification.
    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.publish(NotificationKind::Success, title, message)
    }

    /// Publish an error notification.
    pub fn error(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.publish(NotificationKind::Error, title, message)
    }

    /// Publish a warning notification.
    pub fn warning(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.publish(NotificationKind::Warning, title, message)
    }

    /// Publish an informational notification.
    pub fn info(&self, title: impl Into<String>, message: Option<String>) -> NotificationId {
        self.publish(NotificationKind::Info, title, message)
    }

    /// Remove a notification. Subscribers hear about it only if it was present.
    pub fn dismiss(&self, id: &NotificationId) -> bool {
        self.inner.dismiss(id)
    }

    /// Remove every notification older than the dismiss delay by wall clock.
    ///
    /// Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let expired = self
            .inner
            .lock_list()
            .expire(Utc::now(), self.inner.dismiss_after);
        if !expired.is_empty() {
            self.inner.notify();
        }
        expired.len()
    }

    /// Register a change callback. It stays registered while the returned
    /// handle lives.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Current notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.lock_list().to_vec()
    }

    /// Number of notifications held.
    pub fn len(&self) -> usize {
        self.inner.lock_list().len()
    }

    /// Whether no notification is held.
    pub fn is_empty(&self) -> bool {
        self.inner.lock_list().is_empty()
    }

    /// Number of registered subscribers.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn schedule_dismiss(&self, id: NotificationId) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(%id, "no tokio runtime, notification will not auto-dismiss");
                return;
            }
        };

        let weak = Arc::downgrade(&self.inner);
        let delay = self.inner.dismiss_after;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.dismiss(&id);
            }
        });
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_DISMISS_AFTER)
    }
}

impl std::fmt::Debug for NotificationBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBroadcaster")
            .field("notifications", &self.len())
            .field("listeners", &self.listener_count())
            .field("dismiss_after", &self.inner.dismiss_after)
            .finish()
    }
}

impl Inner {
    fn lock_list(&self) -> std::sync::MutexGuard<'_, NotificationList> {
        self.list.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dismiss(&self, id: &NotificationId) -> bool {
        let removed = self.lock_list().remove(id);
        if removed {
            self.notify();
        }
        removed
    }

    fn notify(&self) {
        let listeners: Vec<(u64, Listener)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                tracing::error!(listener = id, "notification subscriber panicked");
            }
        }
    }
}

/// Handle returned by [`NotificationBroadcaster::subscribe`].
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
