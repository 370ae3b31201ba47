//! Terminal formatting for events, notifications and status.

use livewatch_client::SyncStatus;
use livewatch_core::Phase;
use livewatch_types::{LiveEvent, Notification, Timestamp};

/// One line per event: time, type, source, id.
pub fn event_line(event: &LiveEvent) -> String {
    format!(
        "{}  {:<6} {:<12} {}",
        event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        event.event_type.as_str(),
        event.source,
        event.id
    )
}

/// One line per notification.
pub fn notification_line(notification: &Notification) -> String {
    match &notification.message {
        Some(message) => format!(
            "[{}] {}: {}",
            notification.kind.label(),
            notification.title,
            message
        ),
        None => format!("[{}] {}", notification.kind.label(), notification.title),
    }
}

/// Status summary for the `s` command.
pub fn status_line(status: &SyncStatus) -> String {
    let state = &status.state;
    let mut line = format!(
        "{} | {} buffered | since {} | failures {}/{}",
        status.phase.label(),
        status.buffered,
        format_optional(status.watermark),
        state.consecutive_failures(),
        state.failure_threshold()
    );
    if let Some(at) = state.last_update_at() {
        line.push_str(&format!(" | updated {}", at.format("%H:%M:%S")));
    }
    if let Some(error) = state.last_error() {
        line.push_str(&format!(" | last error: {}", error));
    }
    line
}

/// Warning shown for as long as the controller is in backoff.
pub fn backoff_banner(status: &SyncStatus) -> Option<String> {
    if status.phase != Phase::Backoff {
        return None;
    }
    let state = &status.state;
    Some(format!(
        "!! live sync paused after {} failed polls ({}); press 'r' to retry",
        state.consecutive_failures(),
        state.last_error().unwrap_or("unknown error")
    ))
}

/// Help text for operator commands.
pub const COMMANDS_HELP: &str = "commands: p = pause/resume, r = reset backoff, s = status, q = quit";

fn format_optional(ts: Option<Timestamp>) -> String {
    match ts {
        Some(ts) => ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => "-".to_string(),
    }
}
