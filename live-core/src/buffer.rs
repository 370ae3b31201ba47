//! Event buffer for livewatch.
//!
//! This module provides the retained window of the live event stream with:
//! - Arrival ordering (oldest at the front)
//! - O(1) duplicate detection through an id index
//! - A hard capacity, enforced by evicting from the front after each merge
//!
//! The buffer is also the only source of the retrieval watermark: the
//! cursor is recomputed from what is actually retained, so eviction can make
//! the next fetch redundant but never makes it skip data.

use std::collections::{HashSet, VecDeque};

use livewatch_types::{EventId, LiveEvent, Timestamp};

/// Result of merging one batch into the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Candidates appended to the buffer.
    pub accepted: usize,
    /// Candidates dropped because their id was already retained.
    pub duplicates: usize,
    /// Events evicted from the front to restore capacity.
    pub evicted: usize,
}

impl MergeReport {
    /// Whether the merge changed the buffer at all.
    pub fn changed(&self) -> bool {
        self.accepted > 0 || self.evicted > 0
    }
}

/// Deduplicated, capacity-bounded event window.
///
/// Invariants, held after every public call:
/// - `events.len() == index.len()`
/// - `events.len() <= capacity`
/// - every retained id appears exactly once
#[derive(Debug, Clone)]
pub struct EventBuffer {
    /// Maximum number of retained events.
    capacity: usize,
    /// Retained events, oldest arrival first.
    events: VecDeque<LiveEvent>,
    /// Ids of retained events.
    index: HashSet<EventId>,
}

impl EventBuffer {
    /// Create an empty buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
        }
    }

    /// Merge a batch of candidate events.
    ///
    /// Candidates are considered in input order. A candidate whose id is
    /// already retained (including one accepted earlier in the same batch)
    /// is discarded. Once the whole batch is processed, the oldest arrivals
    /// are evicted until the buffer is back within capacity, and their ids
    /// leave the index so a later re-delivery is accepted again.
    pub fn merge<I>(&mut self, batch: I) -> MergeReport
    where
        I: IntoIterator<Item = LiveEvent>,
    {
        let mut report = MergeReport::default();

        for event in batch {
            if self.index.contains(&event.id) {
                report.duplicates += 1;
                continue;
            }
            self.index.insert(event.id.clone());
            self.events.push_back(event);
            report.accepted += 1;
        }

        while self.events.len() > self.capacity {
            let Some(evicted) = self.events.pop_front() else {
                break;
            };
            self.index.remove(&evicted.id);
            report.evicted += 1;
        }

        report
    }

    /// Latest source timestamp among retained events.
    ///
    /// `None` when the buffer is empty.
    pub fn watermark(&self) -> Option<Timestamp> {
        self.events.iter().map(|event| event.timestamp).max()
    }

    /// Check whether an event id is retained.
    pub fn contains(&self, id: &EventId) -> bool {
        self.index.contains(id)
    }

    /// Iterate over retained events, oldest arrival first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LiveEvent> + ExactSizeIterator {
        self.events.iter()
    }

    /// The `n` most recent arrivals, oldest of them first.
    pub fn newest(&self, n: usize) -> Vec<LiveEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    /// Copy out all retained events, oldest arrival first.
    pub fn to_vec(&self) -> Vec<LiveEvent> {
        self.events.iter().cloned().collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all retained events.
    pub fn clear(&mut self) {
        self.events.clear();
        self.index.clear();
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(crate::DEFAULT_BUFFER_CAPACITY)
    }
}
