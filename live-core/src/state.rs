//! Sync state machine for livewatch.
//!
//! This module provides a pure, side-effect-free reducer for the live sync
//! controller. The reducer takes an event as input and produces a new state
//! plus a list of actions to execute.
//!
//! The actual I/O (timers, HTTP fetches) is performed by live-client, not by
//! this module. This enables instant unit testing without network mocks.

use livewatch_types::Timestamp;

use crate::buffer::MergeReport;
use crate::DEFAULT_FAILURE_THRESHOLD;

/// Coarse controller phase, derived from [`SyncState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Polling is off at the user's request.
    Disabled,
    /// Polling is on and no failure is outstanding.
    Live,
    /// Polling is on but recent polls failed.
    Degraded,
    /// Too many consecutive failures; polling was switched off automatically.
    Backoff,
}

impl Phase {
    /// Short label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Disabled => "paused",
            Self::Live => "live",
            Self::Degraded => "degraded",
            Self::Backoff => "backoff",
        }
    }
}

/// Sync controller state - NO I/O, just state transitions.
///
/// Fields are read-only from outside; every change goes through
/// [`SyncState::on_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    enabled: bool,
    live: bool,
    last_update_at: Option<Timestamp>,
    last_error: Option<String>,
    consecutive_failures: u32,
    in_flight: bool,
    failure_threshold: u32,
}

impl SyncState {
    /// Create the initial state.
    ///
    /// A threshold of zero is treated as one.
    pub fn new(initial_enabled: bool, failure_threshold: u32) -> Self {
        Self {
            enabled: initial_enabled,
            live: false,
            last_update_at: None,
            last_error: None,
            consecutive_failures: 0,
            in_flight: false,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (live-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(mut self, event: Event) -> (Self, Vec<Action>) {
        let mut actions = Vec::new();

        match event {
            Event::Tick => {
                if !self.can_poll() {
                    self.live = false;
                } else if !self.in_flight {
                    self.in_flight = true;
                    actions.push(Action::Poll);
                }
                // A tick while a poll is outstanding is dropped, not queued.
            }

            Event::PollSucceeded { at, report } => {
                let after_failures = self.consecutive_failures;
                self.in_flight = false;
                self.last_update_at = Some(at);
                self.consecutive_failures = 0;
                self.last_error = None;
                self.live = true;

                if after_failures > 0 {
                    actions.push(Action::EmitEvent(SyncEvent::Recovered { after_failures }));
                }
                if report.changed() {
                    actions.push(Action::EmitEvent(SyncEvent::Merged { report }));
                }
            }

            Event::PollFailed { error } => {
                self.in_flight = false;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_error = Some(error.clone());
                self.live = false;

                actions.push(Action::EmitEvent(SyncEvent::PollFailed {
                    attempt: self.consecutive_failures,
                    error: error.clone(),
                }));

                if self.consecutive_failures >= self.failure_threshold {
                    if self.enabled {
                        self.enabled = false;
                        actions.push(Action::StopTimer);
                    }
                    if self.consecutive_failures == self.failure_threshold {
                        actions.push(Action::EmitEvent(SyncEvent::BackoffEntered {
                            failures: self.consecutive_failures,
                            last_error: error,
                        }));
                    }
                }
            }

            Event::Toggle => {
                let next = if self.enabled {
                    Event::Disable
                } else {
                    Event::Enable
                };
                return self.on_event(next);
            }

            Event::Enable | Event::ResetBackoff => {
                let was_enabled = self.enabled;
                self.enabled = true;
                self.consecutive_failures = 0;
                self.last_error = None;
                if !was_enabled {
                    actions.push(Action::StartTimer);
                    actions.push(Action::EmitEvent(SyncEvent::Resumed));
                }
            }

            Event::Disable => {
                if self.enabled {
                    self.enabled = false;
                    actions.push(Action::StopTimer);
                    actions.push(Action::EmitEvent(SyncEvent::Paused));
                }
            }
        }

        (self, actions)
    }

    /// Whether a tick would be allowed to start a poll (ignoring in-flight).
    pub fn can_poll(&self) -> bool {
        self.enabled && self.consecutive_failures < self.failure_threshold
    }

    /// Derived phase.
    pub fn phase(&self) -> Phase {
        if self.consecutive_failures >= self.failure_threshold {
            Phase::Backoff
        } else if !self.enabled {
            Phase::Disabled
        } else if self.consecutive_failures > 0 {
            Phase::Degraded
        } else {
            Phase::Live
        }
    }

    /// Whether polling should run.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the most recent poll succeeded.
    pub fn live(&self) -> bool {
        self.live
    }

    /// Time of the last successful poll.
    pub fn last_update_at(&self) -> Option<Timestamp> {
        self.last_update_at
    }

    /// Message of the most recent failure, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Failures since the last success or manual reset.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether a poll is outstanding.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Failures that trigger backoff.
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(true, DEFAULT_FAILURE_THRESHOLD)
    }
}

/// Inputs to the sync state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Scheduler tick or manual poll request.
    Tick,
    /// The outstanding fetch succeeded and its batch was merged.
    PollSucceeded {
        /// Completion time.
        at: Timestamp,
        /// What the merge did to the buffer.
        report: MergeReport,
    },
    /// The outstanding fetch failed.
    PollFailed {
        /// Human-readable description of the failure.
        error: String,
    },
    /// User flipped the enabled switch.
    Toggle,
    /// User enabled polling.
    Enable,
    /// User disabled polling.
    Disable,
    /// User cleared backoff.
    ResetBackoff,
}

/// Actions to be executed by the live-client controller.
///
/// These are instructions, not side effects. The controller interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Start the periodic scheduler.
    StartTimer,
    /// Stop the periodic scheduler.
    StopTimer,
    /// Compute the watermark, fetch and merge.
    Poll,
    /// Emit an event to the application.
    EmitEvent(SyncEvent),
}

/// Events emitted to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A poll changed the buffer.
    Merged {
        /// What the merge did.
        report: MergeReport,
    },
    /// A poll failed.
    PollFailed {
        /// Consecutive failure count including this one.
        attempt: u32,
        /// Error message describing the failure.
        error: String,
    },
    /// The failure threshold was reached and polling stopped.
    BackoffEntered {
        /// Consecutive failures at the time.
        failures: u32,
        /// The failure that tipped it over.
        last_error: String,
    },
    /// A poll succeeded after one or more failures.
    Recovered {
        /// Failures that preceded this success.
        after_failures: u32,
    },
    /// Polling was switched on by the user.
    Resumed,
    /// Polling was switched off by the user.
    Paused,
}
