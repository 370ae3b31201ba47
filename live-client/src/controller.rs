//! SyncController - the live sync loop for livewatch.
//!
//! [`SyncController`] owns the event buffer and the sync state, and turns
//! scheduler ticks into incremental fetches against an [`EventSource`].
//!
//! # Architecture
//!
//! The controller uses the pure state machine from live-core for every
//! decision and interprets the resulting actions to perform actual I/O.
//!
//! ```text
//! Scheduler → SyncController → EventSource → API
//!                  ↓
//!             live-core (pure state machine, buffer)
//! ```
//!
//! Status snapshots are published on a `watch` channel after every state
//! change; discrete [`SyncEvent`]s go out on a `broadcast` channel.

use std::sync::{Arc, Weak};

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::{broadcast, watch, Mutex};

use livewatch_core::{
    Action, Event, EventBuffer, MergeReport, Phase, SyncEvent, SyncPolicy, SyncState,
    WatermarkMove, WatermarkTracker,
};
use livewatch_types::{EventsQuery, LiveEvent, Timestamp};

use crate::scheduler::{OnTick, Scheduler};
use crate::transport::EventSource;

/// Capacity of the [`SyncEvent`] broadcast channel.
const SYNC_EVENT_CAPACITY: usize = 64;

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Polling is disabled or in backoff; nothing was fetched.
    Skipped,
    /// Another poll was in flight; the tick was dropped.
    Busy,
    /// The fetch succeeded and the batch was merged.
    Merged(MergeReport),
    /// The fetch failed with the given message.
    Failed(String),
}

/// Point-in-time view of a controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncStatus {
    /// Reducer state.
    pub state: SyncState,
    /// Phase derived from `state`.
    pub phase: Phase,
    /// Events currently retained.
    pub buffered: usize,
    /// Latest retained timestamp, sent as `since` on the next poll.
    pub watermark: Option<Timestamp>,
}

impl SyncStatus {
    fn snapshot(state: &SyncState, buffer: &EventBuffer) -> Self {
        Self {
            state: state.clone(),
            phase: state.phase(),
            buffered: buffer.len(),
            watermark: buffer.watermark(),
        }
    }
}

/// The live sync controller.
///
/// Cheap to clone; clones drive the same controller. Dropping the last
/// handle stops the scheduler.
pub struct SyncController<S: EventSource + 'static, K: Scheduler + 'static> {
    inner: Arc<Inner<S, K>>,
}

struct Inner<S: EventSource + 'static, K: Scheduler + 'static> {
    source: S,
    scheduler: K,
    policy: SyncPolicy,
    state: Mutex<SyncState>,
    buffer: Mutex<EventBuffer>,
    watermarks: Mutex<WatermarkTracker>,
    status: watch::Sender<SyncStatus>,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: EventSource + 'static, K: Scheduler + 'static> SyncController<S, K> {
    /// Create a controller. Nothing runs until [`SyncController::start`].
    pub fn new(source: S, scheduler: K, policy: SyncPolicy) -> Self {
        let state = SyncState::new(policy.initial_enabled, policy.failure_threshold);
        let buffer = EventBuffer::new(policy.buffer_capacity);
        let (status, _) = watch::channel(SyncStatus::snapshot(&state, &buffer));
        let (events, _) = broadcast::channel(SYNC_EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                source,
                scheduler,
                policy,
                state: Mutex::new(state),
                buffer: Mutex::new(buffer),
                watermarks: Mutex::new(WatermarkTracker::new()),
                status,
                events,
            }),
        }
    }

    /// Start the scheduler if polling is enabled.
    ///
    /// With [`crate::IntervalScheduler`] the first poll happens immediately.
    pub async fn start(&self) {
        let state = self.inner.state.lock().await;
        if state.enabled() && !self.inner.scheduler.is_running() {
            tracing::info!(
                interval_secs = self.inner.policy.poll_interval.as_secs(),
                page_size = self.inner.policy.page_size,
                "starting live sync"
            );
            self.inner
                .scheduler
                .start(self.inner.policy.poll_interval, self.inner.on_tick());
        }
    }

    /// Run one poll cycle now.
    ///
    /// Never fails; the outcome says what happened. The cycle runs on its own
    /// task so dropping the returned future cannot leave a poll half-applied.
    pub async fn tick(&self) -> PollOutcome {
        let inner = self.inner.clone();
        match tokio::spawn(inner.run_tick()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("poll task aborted: {}", e);
                PollOutcome::Failed(e.to_string())
            }
        }
    }

    /// Flip polling on or off. Turning it on clears failure state.
    pub async fn toggle(&self) {
        self.inner.apply(Event::Toggle).await;
    }

    /// Turn polling on and clear failure state.
    pub async fn enable(&self) {
        self.inner.apply(Event::Enable).await;
    }

    /// Turn polling off. Failure counters are kept.
    pub async fn disable(&self) {
        self.inner.apply(Event::Disable).await;
    }

    /// Leave backoff: clear failure state and resume polling.
    pub async fn reset_backoff(&self) {
        self.inner.apply(Event::ResetBackoff).await;
    }

    /// Stop the scheduler without changing the enabled flag.
    pub fn shutdown(&self) {
        self.inner.scheduler.stop();
        tracing::info!("live sync stopped");
    }

    /// Current status snapshot.
    pub fn status(&self) -> SyncStatus {
        self.inner.status.borrow().clone()
    }

    /// Receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Receiver for discrete sync events.
    pub fn sync_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Retained events, oldest first.
    pub async fn events(&self) -> Vec<LiveEvent> {
        self.inner.buffer.lock().await.to_vec()
    }

    /// Latest retained timestamp.
    pub async fn watermark(&self) -> Option<Timestamp> {
        self.inner.buffer.lock().await.watermark()
    }

    /// Number of retained events.
    pub async fn buffered(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }

    /// How many polls sent a watermark earlier than the one before.
    pub async fn watermark_regressions(&self) -> u64 {
        self.inner.watermarks.lock().await.regressions()
    }

    /// Probe the backend.
    pub async fn check_health(&self) -> bool {
        self.inner.source.check_health().await
    }

    /// The policy this controller was built with.
    pub fn policy(&self) -> &SyncPolicy {
        &self.inner.policy
    }
}

impl<S: EventSource + 'static, K: Scheduler + 'static> Clone for SyncController<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: EventSource + 'static, K: Scheduler + 'static> std::fmt::Debug for SyncController<S, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.status.borrow();
        f.debug_struct("SyncController")
            .field("phase", &status.phase)
            .field("buffered", &status.buffered)
            .field("watermark", &status.watermark)
            .finish()
    }
}

impl<S: EventSource + 'static, K: Scheduler + 'static> Inner<S, K> {
    /// Tick callback handed to the scheduler. Holds only a weak reference.
    fn on_tick(self: &Arc<Self>) -> OnTick {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.run_tick().await;
                }
            }
            .boxed()
        })
    }

    async fn run_tick(self: Arc<Self>) -> PollOutcome {
        let (state, actions) = self.apply(Event::Tick).await;
        if !actions.contains(&Action::Poll) {
            return if state.can_poll() {
                tracing::debug!("poll already in flight, tick dropped");
                PollOutcome::Busy
            } else {
                PollOutcome::Skipped
            };
        }

        let since = self.buffer.lock().await.watermark();
        let movement = self.watermarks.lock().await.observe(since);
        if movement == WatermarkMove::Regressed {
            tracing::warn!(
                since = ?since,
                "watermark moved backward; the server may resend events"
            );
        }

        let query = EventsQuery::new(self.policy.page_size, since);
        tracing::debug!(since = ?since, limit = query.limit, "polling events");

        match self.source.fetch_events(&query).await {
            Ok(batch) => {
                let fetched = batch.len();
                let report = self.buffer.lock().await.merge(batch);
                tracing::debug!(
                    fetched,
                    accepted = report.accepted,
                    duplicates = report.duplicates,
                    evicted = report.evicted,
                    "poll merged"
                );
                self.apply(Event::PollSucceeded {
                    at: Utc::now(),
                    report,
                })
                .await;
                PollOutcome::Merged(report)
            }
            Err(e) => {
                let error = e.to_string();
                self.apply(Event::PollFailed {
                    error: error.clone(),
                })
                .await;
                PollOutcome::Failed(error)
            }
        }
    }

    /// Feed one event through the reducer and perform its actions.
    ///
    /// Actions run and the status is published while the state lock is
    /// held, so observers never see a state whose timer change is pending.
    async fn apply(self: &Arc<Self>, event: Event) -> (SyncState, Vec<Action>) {
        let mut state = self.state.lock().await;
        let before = state.phase();
        let (next, actions) = state.clone().on_event(event);
        *state = next;

        for action in &actions {
            self.execute(action);
        }

        let after = state.phase();
        if before != after {
            tracing::info!(from = before.label(), to = after.label(), "sync phase changed");
        }

        let buffer = self.buffer.lock().await;
        self.status
            .send_replace(SyncStatus::snapshot(&state, &buffer));

        (state.clone(), actions)
    }

    fn execute(self: &Arc<Self>, action: &Action) {
        match action {
            Action::StartTimer => {
                self.scheduler
                    .start(self.policy.poll_interval, self.on_tick());
            }
            Action::StopTimer => self.scheduler.stop(),
            // Performed by the tick that asked for it.
            Action::Poll => {}
            Action::EmitEvent(event) => {
                log_sync_event(event);
                // No receivers is fine.
                let _ = self.events.send(event.clone());
            }
        }
    }
}

impl<S: EventSource + 'static, K: Scheduler + 'static> Drop for Inner<S, K> {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

fn log_sync_event(event: &SyncEvent) {
    match event {
        SyncEvent::Merged { report } => {
            tracing::debug!(accepted = report.accepted, evicted = report.evicted, "events merged");
        }
        SyncEvent::PollFailed { attempt, error } => {
            tracing::warn!(attempt, "poll failed: {}", error);
        }
        SyncEvent::BackoffEntered {
            failures,
            last_error,
        } => {
            tracing::warn!(
                failures,
                "live sync paused after repeated failures: {}",
                last_error
            );
        }
        SyncEvent::Recovered { after_failures } => {
            tracing::info!(after_failures, "live sync recovered");
        }
        SyncEvent::Resumed => tracing::info!("live sync resumed"),
        SyncEvent::Paused => tracing::info!("live sync paused"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use crate::transport::{MockEventSource, TransportError};
    use chrono::{Duration as ChronoDuration, TimeZone};
    use livewatch_types::{EventId, EventType};

    fn at(secs: i64) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + ChronoDuration::seconds(secs)
    }

    fn event(id: &str, secs: i64) -> LiveEvent {
        LiveEvent::new(id, at(secs), EventType::Connection, "sensor-1")
    }

    fn controller(
        policy: SyncPolicy,
    ) -> (
        SyncController<MockEventSource, ManualScheduler>,
        MockEventSource,
        ManualScheduler,
    ) {
        let source = MockEventSource::new();
        let scheduler = ManualScheduler::new();
        let controller = SyncController::new(source.clone(), scheduler.clone(), policy);
        (controller, source, scheduler)
    }

    async fn wait_for_queries(source: &MockEventSource, n: usize) {
        while source.queries().len() < n {
            tokio::task::yield_now().await;
        }
    }

    // ===========================================
    // Poll Cycle Tests
    // ===========================================

    #[tokio::test]
    async fn first_poll_omits_since_and_merges_batch() {
        let (controller, source, _) = controller(SyncPolicy::default());
        let batch: Vec<_> = (0..10).map(|i| event(&format!("e{i}"), i)).collect();
        source.queue_events(batch);

        let outcome = controller.tick().await;

        let query = source.last_query().unwrap();
        assert_eq!(query.since, None);
        assert_eq!(query.limit, 200);
        assert!(matches!(outcome, PollOutcome::Merged(r) if r.accepted == 10));
        assert_eq!(controller.buffered().await, 10);
        assert_eq!(controller.watermark().await, Some(at(9)));

        let status = controller.status();
        assert!(status.state.live());
        assert!(status.state.last_update_at().is_some());
        assert_eq!(status.buffered, 10);
        assert_eq!(status.watermark, Some(at(9)));
    }

    #[tokio::test]
    async fn next_poll_sends_watermark() {
        let (controller, source, _) = controller(SyncPolicy::default());
        source.queue_events(vec![event("a", 5), event("b", 2)]);
        controller.tick().await;

        controller.tick().await;

        assert_eq!(source.last_query().unwrap().since, Some(at(5)));
    }

    #[tokio::test]
    async fn overlapping_batches_are_deduplicated() {
        let (controller, source, _) = controller(SyncPolicy::default());
        source.queue_events(vec![event("a", 1), event("b", 2)]);
        source.queue_events(vec![event("b", 2), event("c", 3)]);

        controller.tick().await;
        let outcome = controller.tick().await;

        assert!(matches!(
            outcome,
            PollOutcome::Merged(MergeReport {
                accepted: 1,
                duplicates: 1,
                ..
            })
        ));
        let ids: Vec<EventId> = controller.events().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["a".into(), "b".into(), "c".into()]);
    }

    #[tokio::test]
    async fn empty_batch_still_counts_as_success() {
        let (controller, source, _) = controller(SyncPolicy::default());
        source.fail_next_fetch("connection refused");
        controller.tick().await;

        let outcome = controller.tick().await;

        assert_eq!(outcome, PollOutcome::Merged(MergeReport::default()));
        let status = controller.status();
        assert_eq!(status.state.consecutive_failures(), 0);
        assert_eq!(status.phase, Phase::Live);
    }

    #[tokio::test]
    async fn failure_leaves_buffer_untouched() {
        let (controller, source, _) = controller(SyncPolicy::default());
        source.queue_events(vec![event("a", 1)]);
        controller.tick().await;
        source.queue_error(TransportError::Status {
            status: 502,
            url: "mock".into(),
        });

        let outcome = controller.tick().await;

        assert!(matches!(outcome, PollOutcome::Failed(ref e) if e.contains("502")));
        assert_eq!(controller.buffered().await, 1);
        let status = controller.status();
        assert!(!status.state.live());
        assert_eq!(status.phase, Phase::Degraded);
        assert_eq!(status.state.last_error(), Some("HTTP 502 from mock"));
    }

    // ===========================================
    // Backoff Tests
    // ===========================================

    #[tokio::test]
    async fn three_failures_enter_backoff_and_stop_timer() {
        let (controller, source, scheduler) = controller(SyncPolicy::default());
        controller.start().await;
        assert!(scheduler.is_running());

        for _ in 0..3 {
            source.fail_next_fetch("connection refused");
            controller.tick().await;
        }

        let status = controller.status();
        assert!(!status.state.enabled());
        assert_eq!(status.state.consecutive_failures(), 3);
        assert_eq!(status.phase, Phase::Backoff);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.stops(), 1);

        // Further ticks fetch nothing.
        assert_eq!(controller.tick().await, PollOutcome::Skipped);
        assert_eq!(source.queries().len(), 3);
    }

    #[tokio::test]
    async fn reset_backoff_resumes_polling() {
        let (controller, source, scheduler) = controller(SyncPolicy::default());
        controller.start().await;
        for _ in 0..3 {
            source.fail_next_fetch("timeout");
            controller.tick().await;
        }

        controller.reset_backoff().await;

        let status = controller.status();
        assert!(status.state.enabled());
        assert_eq!(status.state.consecutive_failures(), 0);
        assert_eq!(status.state.last_error(), None);
        assert_eq!(status.phase, Phase::Live);
        assert!(scheduler.is_running());
        assert_eq!(scheduler.starts(), 2);

        assert!(matches!(controller.tick().await, PollOutcome::Merged(_)));
    }

    #[tokio::test]
    async fn backoff_emits_sync_events() {
        let (controller, source, _) = controller(SyncPolicy::default().with_failure_threshold(2));
        let mut events = controller.sync_events();

        source.fail_next_fetch("boom");
        controller.tick().await;
        source.fail_next_fetch("boom again");
        controller.tick().await;

        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::PollFailed {
                attempt: 1,
                error: "request failed: boom".into()
            }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::PollFailed { attempt: 2, .. }
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::BackoffEntered {
                failures: 2,
                last_error: "request failed: boom again".into()
            }
        );
    }

    // ===========================================
    // Enable / Disable Tests
    // ===========================================

    #[tokio::test]
    async fn tick_while_disabled_is_skipped() {
        let (controller, source, _) =
            controller(SyncPolicy::default().with_initial_enabled(false));

        assert_eq!(controller.tick().await, PollOutcome::Skipped);
        assert!(source.queries().is_empty());
        assert!(!controller.status().state.live());
    }

    #[tokio::test]
    async fn start_respects_initial_enabled() {
        let (controller, _, scheduler) =
            controller(SyncPolicy::default().with_initial_enabled(false));

        controller.start().await;
        assert!(!scheduler.is_running());

        controller.toggle().await;
        assert!(scheduler.is_running());
        assert_eq!(scheduler.period(), Some(controller.policy().poll_interval));
    }

    #[tokio::test]
    async fn toggle_off_stops_timer_and_keeps_failures() {
        let (controller, source, scheduler) = controller(SyncPolicy::default());
        controller.start().await;
        source.fail_next_fetch("refused");
        controller.tick().await;

        controller.toggle().await;

        let status = controller.status();
        assert!(!status.state.enabled());
        assert_eq!(status.state.consecutive_failures(), 1);
        assert!(!scheduler.is_running());

        controller.toggle().await;
        assert_eq!(controller.status().state.consecutive_failures(), 0);
        assert!(scheduler.is_running());
    }

    #[tokio::test]
    async fn scheduler_ticks_drive_polls() {
        let (controller, source, scheduler) = controller(SyncPolicy::default());
        source.queue_events(vec![event("a", 1)]);
        controller.start().await;

        assert!(scheduler.fire().await);

        assert_eq!(source.queries().len(), 1);
        assert_eq!(controller.buffered().await, 1);
    }

    #[tokio::test]
    async fn status_receiver_sees_changes() {
        let (controller, _, _) = controller(SyncPolicy::default());
        let mut status = controller.subscribe();
        status.borrow_and_update();

        controller.disable().await;

        assert!(status.has_changed().unwrap());
        assert_eq!(status.borrow_and_update().phase, Phase::Disabled);
    }

    // ===========================================
    // Concurrency Tests
    // ===========================================

    #[tokio::test]
    async fn tick_during_poll_is_dropped() {
        let (controller, source, _) = controller(SyncPolicy::default());
        source.queue_events(vec![event("a", 1)]);
        source.hold();

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.tick().await })
        };
        wait_for_queries(&source, 1).await;

        assert_eq!(controller.tick().await, PollOutcome::Busy);
        assert_eq!(source.queries().len(), 1);

        source.release();
        assert!(matches!(first.await.unwrap(), PollOutcome::Merged(_)));
        assert!(!controller.status().state.in_flight());
    }

    #[tokio::test]
    async fn late_success_does_not_re_enable() {
        let (controller, source, scheduler) = controller(SyncPolicy::default());
        controller.start().await;
        source.queue_events(vec![event("a", 1)]);
        source.hold();

        let poll = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.tick().await })
        };
        wait_for_queries(&source, 1).await;

        controller.disable().await;
        source.release();

        assert!(matches!(poll.await.unwrap(), PollOutcome::Merged(_)));
        let status = controller.status();
        assert!(!status.state.enabled());
        assert_eq!(status.buffered, 1);
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.starts(), 1);
    }

    #[tokio::test]
    async fn eviction_of_maximum_regresses_watermark() {
        let (controller, source, _) =
            controller(SyncPolicy::default().with_buffer_capacity(2));
        source.queue_events(vec![event("a", 50), event("b", 10)]);
        source.queue_events(vec![event("c", 20), event("d", 30)]);

        controller.tick().await; // since = none
        controller.tick().await; // since = 50, evicts a and b
        controller.tick().await; // since = 30

        let queries = source.queries();
        assert_eq!(queries[1].since, Some(at(50)));
        assert_eq!(queries[2].since, Some(at(30)));
        assert_eq!(controller.watermark_regressions().await, 1);
    }

    // ===========================================
    // Lifecycle Tests
    // ===========================================

    #[tokio::test]
    async fn shutdown_stops_scheduler() {
        let (controller, _, scheduler) = controller(SyncPolicy::default());
        controller.start().await;

        controller.shutdown();

        assert!(!scheduler.is_running());
        assert!(controller.status().state.enabled());
    }

    #[tokio::test]
    async fn dropping_last_handle_stops_scheduler() {
        let (controller, _, scheduler) = controller(SyncPolicy::default());
        controller.start().await;
        let clone = controller.clone();

        drop(controller);
        assert!(scheduler.is_running());

        drop(clone);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn health_delegates_to_source() {
        let (controller, source, _) = controller(SyncPolicy::default());
        assert!(controller.check_health().await);
        source.set_healthy(false);
        assert!(!controller.check_health().await);
    }
}
