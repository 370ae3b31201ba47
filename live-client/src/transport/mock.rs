//! Mock event source for testing.
//!
//! Allows queueing batches and failures, and captures issued queries for
//! verification.

use super::{EventSource, TransportError};
use async_trait::async_trait;
use livewatch_types::{EventsQuery, LiveEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mock event source for testing.
///
/// Clones share state, so a test can keep one handle while the controller
/// owns another. When no scripted response is queued, a fetch returns an
/// empty batch.
#[derive(Debug, Default, Clone)]
pub struct MockEventSource {
    inner: Arc<Mutex<MockEventSourceInner>>,
}

#[derive(Debug)]
struct MockEventSourceInner {
    queries: Vec<EventsQuery>,
    responses: VecDeque<Result<Vec<LiveEvent>, TransportError>>,
    fail_next_fetch: Option<String>,
    gate: Option<Arc<Notify>>,
    healthy: bool,
}

impl Default for MockEventSourceInner {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            responses: VecDeque::new(),
            fail_next_fetch: None,
            gate: None,
            healthy: true,
        }
    }
}

impl MockEventSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch to be returned by a future fetch.
    pub fn queue_events(&self, events: Vec<LiveEvent>) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(Ok(events));
    }

    /// Queue an error to be returned by a future fetch, in order with batches.
    pub fn queue_error(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(Err(error));
    }

    /// Cause the next fetch to fail, ahead of anything queued.
    pub fn fail_next_fetch(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_fetch = Some(error.to_string());
    }

    /// Make subsequent fetches wait until [`MockEventSource::release`].
    pub fn hold(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.gate = Some(Arc::new(Notify::new()));
    }

    /// Let a held fetch complete.
    pub fn release(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(gate) = inner.gate.take() {
            gate.notify_one();
        }
    }

    /// Set the answer of `check_health()`.
    pub fn set_healthy(&self, healthy: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.healthy = healthy;
    }

    /// Get all queries that were issued.
    pub fn queries(&self) -> Vec<EventsQuery> {
        let inner = self.inner.lock().unwrap();
        inner.queries.clone()
    }

    /// Get the last query that was issued.
    pub fn last_query(&self) -> Option<EventsQuery> {
        let inner = self.inner.lock().unwrap();
        inner.queries.last().cloned()
    }

    /// Number of scripted responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.responses.len()
    }

    /// Clear all state (queries, queue, gate, failures).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockEventSourceInner::default();
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(&self, query: &EventsQuery) -> Result<Vec<LiveEvent>, TransportError> {
        let gate = {
            let mut inner = self.inner.lock().unwrap();
            inner.queries.push(query.clone());
            inner.gate.clone()
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut inner = self.inner.lock().unwrap();

        // Check for forced failure
        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(TransportError::Request(error));
        }

        inner.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn check_health(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use livewatch_types::EventType;

    fn event(id: &str) -> LiveEvent {
        LiveEvent::new(id, Utc::now(), EventType::Alert, "engine")
    }

    fn query() -> EventsQuery {
        EventsQuery::new(200, None)
    }

    // ===========================================
    // MockEventSource Basic Tests
    // ===========================================

    #[tokio::test]
    async fn returns_queued_batches_in_order() {
        let source = MockEventSource::new();
        source.queue_events(vec![event("a")]);
        source.queue_events(vec![event("b"), event("c")]);

        let first = source.fetch_events(&query()).await.unwrap();
        let second = source.fetch_events(&query()).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn empty_queue_returns_empty_batch() {
        let source = MockEventSource::new();
        let batch = source.fetch_events(&query()).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn records_queries() {
        let source = MockEventSource::new();
        let since = Utc::now();

        source.fetch_events(&query()).await.unwrap();
        source
            .fetch_events(&EventsQuery::new(10, Some(since)))
            .await
            .unwrap();

        let queries = source.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].since, None);
        assert_eq!(source.last_query().unwrap().since, Some(since));
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn forced_failure_takes_priority() {
        let source = MockEventSource::new();
        source.queue_events(vec![event("a")]);
        source.fail_next_fetch("connection refused");

        let result = source.fetch_events(&query()).await;
        assert!(matches!(result, Err(TransportError::Request(_))));

        // Next fetch gets the queued batch
        let batch = source.fetch_events(&query()).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn queued_error_is_returned_in_order() {
        let source = MockEventSource::new();
        source.queue_events(vec![event("a")]);
        source.queue_error(TransportError::Status {
            status: 500,
            url: "mock".into(),
        });

        assert!(source.fetch_events(&query()).await.is_ok());
        assert!(matches!(
            source.fetch_events(&query()).await,
            Err(TransportError::Status { status: 500, .. })
        ));
        assert_eq!(source.pending_responses(), 0);
    }

    #[tokio::test]
    async fn health_is_scriptable() {
        let source = MockEventSource::new();
        assert!(source.check_health().await);
        source.set_healthy(false);
        assert!(!source.check_health().await);
    }

    // ===========================================
    // Gate and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn held_fetch_waits_for_release() {
        let source = MockEventSource::new();
        source.queue_events(vec![event("a")]);
        source.hold();

        let task = {
            let source = source.clone();
            tokio::spawn(async move { source.fetch_events(&query()).await })
        };

        while source.queries().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());

        source.release();
        let batch = task.await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let source1 = MockEventSource::new();
        let source2 = source1.clone();

        source1.queue_events(vec![event("a")]);
        let batch = source2.fetch_events(&query()).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(source1.queries().len(), 1);
    }

    #[tokio::test]
    async fn reset_clears_all() {
        let source = MockEventSource::new();
        source.queue_events(vec![event("a")]);
        source.set_healthy(false);
        source.fetch_events(&query()).await.unwrap();

        source.reset();

        assert!(source.queries().is_empty());
        assert_eq!(source.pending_responses(), 0);
        assert!(source.check_health().await);
    }
}
