//! Lookback buffer of analysed frames.
//!
//! Frames wait here for `lookback` frames before they are cropped, so the
//! crop for a frame can use detections from the frames just after it, and so
//! the frames before a scene cut can be flushed with the old shot's context
//! the moment the cut is seen.

use std::collections::VecDeque;

use super::analyzer::AnalysisResult;

/// One buffered frame and its analysis.
pub type ReframeBufferEntry = AnalysisResult;

/// FIFO of analysed frames.
#[derive(Debug)]
pub struct ReframeBuffer {
    entries: VecDeque<ReframeBufferEntry>,
    lookback: usize,
}

impl ReframeBuffer {
    pub fn new(lookback: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(lookback * 2 + 1),
            lookback,
        }
    }

    pub fn push(&mut self, entry: ReframeBufferEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<ReframeBufferEntry> {
        self.entries.pop_front()
    }

    /// Remove every entry, oldest first.
    pub fn drain_all(&mut self) -> Vec<ReframeBufferEntry> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Entries beyond the lookback depth.
    pub fn excess(&self) -> usize {
        self.entries.len().saturating_sub(self.lookback)
    }

    /// Depth past which draining no longer waits for downstream.
    pub fn is_overfull(&self) -> bool {
        self.entries.len() > self.lookback * 2
    }

    /// How many entries to emit now.
    ///
    /// Normally limited by free downstream capacity. Once overfull, every
    /// excess entry is drained and the caller blocks on the sink instead.
    pub fn drain_count(&self, downstream_capacity: usize) -> usize {
        if self.is_overfull() {
            self.excess()
        } else {
            self.excess().min(downstream_capacity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::intelligent::analyzer::FrameAnalysis;

    fn entry(pts: i64) -> ReframeBufferEntry {
        AnalysisResult {
            frame: Frame::solid(2, 2, pts, [0; 4]),
            analysis: FrameAnalysis {
                pts,
                ..Default::default()
            },
        }
    }

    fn filled(n: i64) -> ReframeBuffer {
        let mut buffer = ReframeBuffer::new(6);
        for pts in 0..n {
            buffer.push(entry(pts));
        }
        buffer
    }

    #[test]
    fn test_steady_state() {
        let buffer = filled(6);
        assert_eq!(buffer.drain_count(12), 0);

        let buffer = filled(7);
        assert_eq!(buffer.drain_count(12), 1);
    }

    #[test]
    fn test_saturated_downstream_lets_buffer_grow() {
        let buffer = filled(10);
        assert_eq!(buffer.drain_count(0), 0);
        assert_eq!(buffer.drain_count(2), 2);
        assert!(!buffer.is_overfull());
    }

    #[test]
    fn test_overfull_forces_drain_to_lookback() {
        let buffer = filled(13);
        assert!(buffer.is_overfull());
        assert_eq!(buffer.drain_count(0), 7);
    }

    #[test]
    fn test_fifo_order() {
        let mut buffer = filled(3);
        assert_eq!(buffer.pop().map(|e| e.frame.pts), Some(0));
        let rest: Vec<i64> = buffer.drain_all().iter().map(|e| e.frame.pts).collect();
        assert_eq!(rest, vec![1, 2]);
        assert!(buffer.is_empty());
    }
}
