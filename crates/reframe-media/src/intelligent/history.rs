//! Detection history for the current shot.

use reframe_models::{ClassCounts, DetectionOutput};
use std::collections::VecDeque;

/// Detection outputs gathered since the last scene cut, oldest first.
///
/// Bounded: once full, the oldest entry is dropped for each new one.
#[derive(Debug, Clone)]
pub struct DetectionHistory {
    entries: VecDeque<DetectionOutput>,
    max_len: usize,
}

impl DetectionHistory {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            entries: VecDeque::with_capacity(max_len),
            max_len,
        }
    }

    pub fn push(&mut self, detection: DetectionOutput) {
        if self.entries.len() == self.max_len {
            self.entries.pop_front();
        }
        self.entries.push_back(detection);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectionOutput> + Clone {
        self.entries.iter()
    }

    /// The newest `n` entries.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &DetectionOutput> + Clone {
        self.entries.iter().skip(self.entries.len().saturating_sub(n))
    }

    /// Per-class maximum count over the whole history.
    pub fn max_counts(&self) -> ClassCounts {
        self.entries.iter().fold(ClassCounts::new(), |mut acc, d| {
            acc.merge_max(&d.class_counts);
            acc
        })
    }
}
