//! Rolling window of recent block observations.

use crate::models::BlockSample;
use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 10;

/// FIFO window over the most recent [`HISTORY_CAPACITY`] block samples.
///
/// Samples stay in append order. The oldest sample is the baseline for the
/// block rate and ages out as new samples arrive.
#[derive(Debug, Clone)]
pub struct BlockHistory {
    samples: VecDeque<BlockSample>,
    capacity: usize,
}

impl Default for BlockHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl BlockHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, sample: BlockSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockSample> {
        self.samples.iter()
    }

    pub fn oldest(&self) -> Option<&BlockSample> {
        self.samples.front()
    }

    pub fn newest(&self) -> Option<&BlockSample> {
        self.samples.back()
    }

    /// Blocks per second between the oldest and newest samples.
    ///
    /// Zero when the window is empty, when either endpoint has no commit time,
    /// or when both endpoints share the same commit time.
    #[allow(clippy::as_conversions)]
    pub fn block_rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.oldest(), self.newest()) else {
            return 0.0;
        };
        let (Some(start), Some(end)) = (first.observed_at, last.observed_at) else {
            return 0.0;
        };

        let elapsed = end.signed_duration_since(start);
        if elapsed.is_zero() {
            return 0.0;
        }

        let blocks = i128::from(last.height) - i128::from(first.height);
        let elapsed_secs = elapsed.num_nanoseconds().map_or_else(
            || elapsed.num_milliseconds() as f64 / 1e3,
            |nanos| nanos as f64 / 1e9,
        );
        blocks as f64 / elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(second: i64) -> Option<DateTime<Utc>> {
        Some(Utc.timestamp_opt(1_700_000_000 + second, 0).unwrap())
    }

    fn sample(height: u64, second: i64) -> BlockSample {
        BlockSample {
            height,
            observed_at: at(second),
        }
    }

    #[test]
    fn empty_and_single_sample_windows_have_zero_rate() {
        let mut history = BlockHistory::default();
        assert_eq!(history.block_rate(), 0.0);

        history.push(sample(10, 0));
        assert_eq!(history.block_rate(), 0.0);
    }

    #[test]
    fn zero_elapsed_time_yields_zero_rate() {
        let mut history = BlockHistory::default();
        history.push(sample(10, 5));
        history.push(sample(15, 5));
        history.push(sample(20, 5));

        assert_eq!(history.block_rate(), 0.0);
    }

    #[test]
    fn rate_uses_oldest_and_newest_samples() {
        let mut history = BlockHistory::default();
        history.push(sample(100, 0));
        history.push(sample(110, 10));

        assert_eq!(history.block_rate(), 1.0);
    }

    #[test]
    fn intermediate_samples_do_not_affect_rate() {
        let mut sparse = BlockHistory::default();
        sparse.push(sample(100, 0));
        sparse.push(sample(140, 20));

        let mut dense = BlockHistory::default();
        dense.push(sample(100, 0));
        dense.push(sample(500, 1));
        dense.push(sample(101, 19));
        dense.push(sample(140, 20));

        assert_eq!(sparse.block_rate(), dense.block_rate());
        assert_eq!(dense.block_rate(), 2.0);
    }

    #[test]
    fn eviction_keeps_the_ten_most_recent_in_order() {
        let mut history = BlockHistory::default();
        for height in 0..25u64 {
            history.push(sample(height, i64::try_from(height).unwrap()));
            assert!(history.len() <= HISTORY_CAPACITY);
        }

        let heights: Vec<u64> = history.iter().map(|sample| sample.height).collect();
        assert_eq!(heights, (15..25).collect::<Vec<_>>());
        assert_eq!(history.oldest().map(|s| s.height), Some(15));
        assert_eq!(history.newest().map(|s| s.height), Some(24));
    }

    #[test]
    fn eleventh_append_drops_only_the_oldest() {
        let mut history = BlockHistory::default();
        for height in 0..11u64 {
            history.push(sample(height, 0));
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.oldest().map(|s| s.height), Some(1));
    }

    #[test]
    fn baseline_ages_out_with_new_samples() {
        let mut history = BlockHistory::with_capacity(2);
        history.push(sample(0, 0));
        history.push(sample(10, 10));
        history.push(sample(40, 20));

        assert_eq!(history.block_rate(), 3.0);
    }

    #[test]
    fn unknown_commit_time_at_an_endpoint_yields_zero_rate() {
        let mut history = BlockHistory::default();
        history.push(BlockSample {
            height: 0,
            observed_at: None,
        });
        history.push(sample(50, 10));

        assert_eq!(history.block_rate(), 0.0);
    }

    #[test]
    fn height_regression_gives_negative_rate() {
        let mut history = BlockHistory::default();
        history.push(sample(100, 0));
        history.push(sample(90, 5));

        assert_eq!(history.block_rate(), -2.0);
    }
}
