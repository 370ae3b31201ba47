//! Tick scheduling for the sync controller.
//!
//! The controller never owns a timer directly; it asks a [`Scheduler`] to
//! start or stop delivering ticks. [`IntervalScheduler`] drives ticks from a
//! tokio interval, [`ManualScheduler`] lets tests fire them explicitly.

use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Callback invoked on every tick. The returned future is the tick's work.
pub type OnTick = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Source of periodic ticks.
pub trait Scheduler: Send + Sync {
    /// Start delivering ticks every `period`, replacing any running schedule.
    fn start(&self, period: Duration, on_tick: OnTick);

    /// Stop delivering ticks. Work already started by a tick is not cancelled.
    fn stop(&self);

    /// Whether ticks are currently being delivered.
    fn is_running(&self) -> bool;
}

/// Scheduler backed by `tokio::time::interval`.
///
/// The first tick fires immediately on `start`. Each tick's work is spawned
/// as its own task, so a slow poll never delays the timer; overlapping work
/// is the controller's concern. Missed ticks are skipped, not bursted.
#[derive(Debug, Default)]
pub struct IntervalScheduler {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IntervalScheduler {
    /// Create a stopped scheduler.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for IntervalScheduler {
    fn start(&self, period: Duration, on_tick: OnTick) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("cannot start scheduler outside a tokio runtime: {}", e);
                return;
            }
        };

        let period = period.max(Duration::from_millis(1));
        let task = handle.spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                tokio::spawn(on_tick());
            }
        });

        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
        tracing::debug!(period_ms = period.as_millis() as u64, "scheduler started");
    }

    fn stop(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
            tracing::debug!("scheduler stopped");
        }
    }

    fn is_running(&self) -> bool {
        let slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IntervalScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Scheduler whose ticks are fired by the caller.
///
/// Clones share state. Records start/stop calls for verification.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualSchedulerInner>>,
}

#[derive(Default)]
struct ManualSchedulerInner {
    on_tick: Option<OnTick>,
    period: Option<Duration>,
    starts: usize,
    stops: usize,
}

impl ManualScheduler {
    /// Create a stopped scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire one tick and wait for its work to finish.
    ///
    /// Returns `false` without doing anything when stopped.
    pub async fn fire(&self) -> bool {
        let on_tick = {
            let inner = self.inner.lock().unwrap();
            inner.on_tick.clone()
        };
        match on_tick {
            Some(on_tick) => {
                on_tick().await;
                true
            }
            None => false,
        }
    }

    /// Period passed to the most recent `start`.
    pub fn period(&self) -> Option<Duration> {
        self.inner.lock().unwrap().period
    }

    /// Number of `start` calls.
    pub fn starts(&self) -> usize {
        self.inner.lock().unwrap().starts
    }

    /// Number of `stop` calls that stopped a running schedule.
    pub fn stops(&self) -> usize {
        self.inner.lock().unwrap().stops
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ManualScheduler")
            .field("running", &inner.on_tick.is_some())
            .field("period", &inner.period)
            .field("starts", &inner.starts)
            .field("stops", &inner.stops)
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, period: Duration, on_tick: OnTick) {
        let mut inner = self.inner.lock().unwrap();
        inner.on_tick = Some(on_tick);
        inner.period = Some(period);
        inner.starts += 1;
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.on_tick.take().is_some() {
            inner.stops += 1;
        }
    }

    fn is_running(&self) -> bool {
        self.inner.lock().unwrap().on_tick.is_some()
    }
}
