//! Follow the live event stream.
//!
//! Runs a [`SyncController`] on a tokio interval, prints every newly merged
//! event and every notification, and reads single-letter operator commands
//! from stdin.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;

use livewatch_client::{
    EventSource, HttpEventSource, IntervalScheduler, LiveConfig, NotificationBroadcaster,
    SyncController,
};
use livewatch_core::SyncEvent;
use livewatch_types::{EventId, LiveEvent, Notification, NotificationId};

use super::render;

/// How often the backoff banner is repeated while backoff lasts.
const BANNER_REPEAT: Duration = Duration::from_secs(30);

type Controller = SyncController<HttpEventSource, IntervalScheduler>;

/// Operator command read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Pause or resume polling.
    Toggle,
    /// Leave backoff.
    Reset,
    /// Print the status line.
    Status,
    /// Exit.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        match line.trim() {
            "" => None,
            "p" | "pause" | "resume" => Some(Ok(Self::Toggle)),
            "r" | "reset" => Some(Ok(Self::Reset)),
            "s" | "status" => Some(Ok(Self::Status)),
            "q" | "quit" | "exit" => Some(Ok(Self::Quit)),
            other => Some(Err(other.to_string())),
        }
    }
}

/// Run the watch command.
pub async fn run(config: &LiveConfig, paused: bool) -> Result<()> {
    let mut policy = config.policy();
    if paused {
        policy = policy.with_initial_enabled(false);
    }

    let source = HttpEventSource::from_config(&config.api).context("Invalid API configuration")?;
    if !source.check_health().await {
        tracing::warn!(url = %source.health_url(), "events API not reachable, polling anyway");
    }
    println!("watching {}", source.events_url());
    println!("{}", render::COMMANDS_HELP);

    let controller = SyncController::new(source, IntervalScheduler::new(), policy);
    let notifications = NotificationBroadcaster::new(
        config.notifications.capacity,
        config.notifications.dismiss_after(),
    );

    let changed = Arc::new(Notify::new());
    let _subscription = {
        let changed = changed.clone();
        notifications.subscribe(move || changed.notify_one())
    };

    let mut sync_events = controller.sync_events();
    let mut status = controller.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut printer = NotificationPrinter::default();
    let mut events = EventPrinter::default();
    let mut banner = tokio::time::interval(BANNER_REPEAT);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if !controller.status().state.enabled() {
        println!("polling is paused; press 'p' to start");
    }
    controller.start().await;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,

            event = sync_events.recv() => match event {
                Ok(event) => on_sync_event(&controller, &notifications, &mut events, event).await,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "sync events dropped");
                }
                Err(RecvError::Closed) => break,
            },

            _ = changed.notified() => printer.print_new(&notifications),

            Ok(()) = status.changed() => {
                let snapshot = status.borrow_and_update().clone();
                if let Some(line) = render::backoff_banner(&snapshot) {
                    println!("{}", line);
                    banner.reset();
                }
            }

            _ = banner.tick() => {
                if let Some(line) = render::backoff_banner(&controller.status()) {
                    println!("{}", line);
                }
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if run_command(&controller, &line).await {
                        break;
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    controller.shutdown();
    println!("stopped with {} events buffered", controller.buffered().await);
    Ok(())
}

/// Execute one operator command. Returns `true` to quit.
async fn run_command(controller: &Controller, line: &str) -> bool {
    match Command::parse(line) {
        None => {}
        Some(Ok(Command::Toggle)) => controller.toggle().await,
        Some(Ok(Command::Reset)) => controller.reset_backoff().await,
        Some(Ok(Command::Status)) => {
            let status = controller.status();
            println!("{}", render::status_line(&status));
            if let Some(banner) = render::backoff_banner(&status) {
                println!("{}", banner);
            }
        }
        Some(Ok(Command::Quit)) => return true,
        Some(Err(unknown)) => {
            println!("unknown command '{}'; {}", unknown, render::COMMANDS_HELP);
        }
    }
    false
}

async fn on_sync_event(
    controller: &Controller,
    notifications: &NotificationBroadcaster,
    events: &mut EventPrinter,
    event: SyncEvent,
) {
    match event {
        SyncEvent::Merged { .. } => {
            for line in events.take_new(&controller.events().await) {
                println!("{}", line);
            }
        }
        SyncEvent::PollFailed { attempt, error } => {
            notifications.warning("Poll failed", Some(format!("attempt {}: {}", attempt, error)));
        }
        SyncEvent::BackoffEntered { failures, .. } => {
            notifications.error(
                "Live sync paused",
                Some(format!("{} consecutive failures", failures)),
            );
        }
        SyncEvent::Recovered { after_failures } => {
            notifications.success(
                "Live sync recovered",
                Some(format!("after {} failed polls", after_failures)),
            );
        }
        SyncEvent::Resumed => {
            notifications.info("Live sync resumed", None);
        }
        SyncEvent::Paused => {
            notifications.info("Live sync paused", None);
        }
    }
}

/// Prints each buffered event once, in arrival order.
///
/// Works from the buffer contents rather than the merge report, so merges
/// that land before their event is handled are still printed exactly once.
#[derive(Debug, Default)]
struct EventPrinter {
    shown: HashSet<EventId>,
}

impl EventPrinter {
    /// Lines for events not shown before. Forgets ids no longer buffered.
    fn take_new(&mut self, buffered: &[LiveEvent]) -> Vec<String> {
        let lines = buffered
            .iter()
            .filter(|e| !self.shown.contains(&e.id))
            .map(render::event_line)
            .collect();
        self.shown = buffered.iter().map(|e| e.id.clone()).collect();
        lines
    }
}

/// Prints each notification once, the first time it is seen.
#[derive(Debug, Default)]
struct NotificationPrinter {
    shown: HashSet<NotificationId>,
}

impl NotificationPrinter {
    fn print_new(&mut self, notifications: &NotificationBroadcaster) {
        for line in self.take_new(&notifications.notifications()) {
            println!("{}", line);
        }
    }

    /// Lines for notifications not shown before, oldest first. Forgets ids
    /// no longer listed.
    fn take_new(&mut self, current: &[Notification]) -> Vec<String> {
        let lines = current
            .iter()
            .rev()
            .filter(|n| !self.shown.contains(&n.id))
            .map(render::notification_line)
            .collect();
        self.shown = current.iter().map(|n| n.id).collect();
        lines
    }
}
