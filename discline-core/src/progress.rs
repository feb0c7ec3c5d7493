// ============================================================================
// discline-core/src/progress.rs
// ============================================================================
//
// PROGRESS TRACKING: Block Positions to Deduplicated Progress Samples
//
// Tools report absolute block addresses and a block total. The tracker turns
// those into percent and processed-size samples relative to the start of the
// requested sector range, and only lets a sample through when its integer
// value moves past the highest value already emitted in this run.
//
// KEY COMPONENTS:
// - ProgressTracker: per-run watermark state
// - ProgressSample: what changed after one position report

use serde::Serialize;

/// Size of one data sector in KiB.
pub const SECTOR_SIZE_KIB: u64 = 2;

/// Output of [`ProgressTracker::advance`]. Fields are `None` when the
/// corresponding value did not pass its watermark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSample {
    pub percent: Option<u8>,
    /// `(processed KiB, total KiB)`.
    pub processed_kib: Option<(u64, u64)>,
}

impl ProgressSample {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.percent.is_none() && self.processed_kib.is_none()
    }
}

/// Per-run progress state.
///
/// Watermarks only move up. A downward revision of the total does not reset
/// them, so percent stays non-decreasing for the whole run.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    offset: u64,
    total_blocks: Option<u64>,
    last_percent: Option<u8>,
    last_kib: Option<u64>,
}

impl ProgressTracker {
    /// Creates a tracker; `offset` is the first block of the requested range
    /// (0 when reading the whole medium).
    #[must_use]
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    /// Blocks to read in this run, if announced.
    #[must_use]
    pub fn total_blocks(&self) -> Option<u64> {
        self.total_blocks
    }

    #[must_use]
    pub fn last_percent(&self) -> Option<u8> {
        self.last_percent
    }

    /// Records an announced (absolute) end block.
    pub fn set_total(&mut self, announced: u64) {
        self.total_blocks = Some(announced.saturating_sub(self.offset));
    }

    /// Records a new absolute position and returns whatever passed its
    /// watermark.
    pub fn advance(&mut self, position: u64) -> ProgressSample {
        let current = position.saturating_sub(self.offset);
        let mut sample = ProgressSample::default();

        if let Some(total) = self.total_blocks.filter(|&t| t > 0) {
            let percent = (u128::from(current) * 100 / u128::from(total)).min(100) as u8;
            if self.last_percent.is_none_or(|last| percent > last) {
                self.last_percent = Some(percent);
                sample.percent = Some(percent);
            }
        }

        let kib = current.saturating_mul(SECTOR_SIZE_KIB);
        if self.last_kib.is_none_or(|last| kib > last) {
            self.last_kib = Some(kib);
            let total_kib = self.total_blocks.unwrap_or(0).saturating_mul(SECTOR_SIZE_KIB);
            sample.processed_kib = Some((kib, total_kib));
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_against_announced_total() {
        let mut tracker = ProgressTracker::new(0);
        tracker.set_total(12345);
        let sample = tracker.advance(6000);
        assert_eq!(sample.percent, Some(48));
        assert_eq!(sample.processed_kib, Some((12000, 24690)));
    }

    #[test]
    fn test_each_percent_emitted_once() {
        let mut tracker = ProgressTracker::new(0);
        tracker.set_total(1000);
        let mut emitted = Vec::new();
        for position in (0..=1000).step_by(3).chain([1000, 999, 1000]) {
            if let Some(p) = tracker.advance(position).percent {
                emitted.push(p);
            }
        }
        let mut sorted = emitted.clone();
        sorted.dedup();
        assert_eq!(emitted, sorted);
        assert!(emitted.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(emitted.first(), Some(&0));
        assert_eq!(emitted.last(), Some(&100));
    }

    #[test]
    fn test_offset_is_subtracted() {
        let mut tracker = ProgressTracker::new(1000);
        tracker.set_total(2000);
        assert_eq!(tracker.total_blocks(), Some(1000));
        assert_eq!(tracker.advance(1500).percent, Some(50));
        // Positions before the range start count as zero.
        assert_eq!(tracker.advance(10).percent, None);
    }

    #[test]
    fn test_no_percent_without_total() {
        let mut tracker = ProgressTracker::new(0);
        let sample = tracker.advance(500);
        assert_eq!(sample.percent, None);
        assert_eq!(sample.processed_kib, Some((1000, 0)));

        tracker.set_total(0);
        assert_eq!(tracker.advance(600).percent, None);
    }

    #[test]
    fn test_downward_revision_keeps_watermark() {
        let mut tracker = ProgressTracker::new(0);
        tracker.set_total(1000);
        assert_eq!(tracker.advance(600).percent, Some(60));
        tracker.set_total(2000);
        // 30% of the new total is below the watermark.
        assert_eq!(tracker.advance(600).percent, None);
        assert_eq!(tracker.advance(1300).percent, Some(65));
        tracker.set_total(1300);
        assert_eq!(tracker.advance(1300).percent, Some(100));
        assert_eq!(tracker.last_percent(), Some(100));
    }

    #[test]
    fn test_position_past_total_clamps() {
        let mut tracker = ProgressTracker::new(0);
        tracker.set_total(100);
        assert_eq!(tracker.advance(250).percent, Some(100));
        assert!(tracker.advance(300).percent.is_none());
    }
}
