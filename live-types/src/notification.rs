//! Short-lived user-facing notifications.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{NotificationId, Timestamp};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
    /// Something needs attention.
    Warning,
    /// Neutral status information.
    Info,
}

impl NotificationKind {
    /// Short uppercase label for terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERROR",
            Self::Warning => "WARN",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique id, used for dismissal.
    pub id: NotificationId,
    /// Severity.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Headline.
    pub title: String,
    /// Optional detail text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Creation instant.
    pub created_at: Timestamp,
}

impl Notification {
    /// Create a notification stamped with the current time.
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: Option<String>) -> Self {
        Self {
            id: NotificationId::new(),
            kind,
            title: title.into(),
            message,
            created_at: chrono::Utc::now(),
        }
    }
}
