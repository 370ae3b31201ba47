//! Watermark tracking for livewatch.
//!
//! The retrieval cursor is always recomputed from the events the buffer
//! retains (see [`crate::EventBuffer::watermark`]). This module only keeps a
//! history of the watermarks actually sent so the controller can tell when
//! one moves backward:
//! - after eviction dropped the event holding the previous maximum
//! - when the source clock regressed between batches
//!
//! A regression is reported, not corrected; the server sees the regressed
//! watermark and at worst returns events the buffer deduplicates.

use livewatch_types::Timestamp;

/// How a newly observed watermark relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkMove {
    /// First watermark after construction or reset.
    Initial,
    /// Strictly later than the previous watermark.
    Advanced,
    /// Identical to the previous watermark (including both absent).
    Unchanged,
    /// Earlier than the previous watermark, or absent after being present.
    Regressed,
}

/// Tracks the sequence of watermarks sent to the events API.
#[derive(Debug, Clone, Default)]
pub struct WatermarkTracker {
    /// Last observed watermark; outer `None` means nothing observed yet.
    last: Option<Option<Timestamp>>,
    /// Highest watermark ever observed.
    highest: Option<Timestamp>,
    /// Number of observed regressions.
    regressions: u64,
}

impl WatermarkTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the watermark used for a poll and classify the move.
    pub fn observe(&mut self, watermark: Option<Timestamp>) -> WatermarkMove {
        let movement = match self.last {
            None => WatermarkMove::Initial,
            Some(previous) if previous == watermark => WatermarkMove::Unchanged,
            Some(previous) if watermark > previous => WatermarkMove::Advanced,
            Some(_) => WatermarkMove::Regressed,
        };

        if movement == WatermarkMove::Regressed {
            self.regressions += 1;
        }
        self.last = Some(watermark);
        self.highest = self.highest.max(watermark);
        movement
    }

    /// Last observed watermark, `None` if nothing was observed or it was absent.
    pub fn last(&self) -> Option<Timestamp> {
        self.last.flatten()
    }

    /// Highest watermark ever observed.
    pub fn highest(&self) -> Option<Timestamp> {
        self.highest
    }

    /// Number of regressions observed so far.
    pub fn regressions(&self) -> u64 {
        self.regressions
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
