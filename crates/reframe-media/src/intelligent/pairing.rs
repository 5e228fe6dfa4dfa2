//! Pairs each frame with its predecessor for scene scoring.
//!
//! The held frame shares its pixels with the frame passed downstream, so
//! pairing never copies image data.

use crate::frame::Frame;

/// The current frame and, except for the first frame, the one before it.
#[derive(Debug, Clone)]
pub struct FramePair {
    pub previous: Option<Frame>,
    pub current: Frame,
}

/// One-slot stage holding the last frame seen.
#[derive(Debug, Default)]
pub struct PairingStage {
    last: Option<Frame>,
}

impl PairingStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `frame` with the previous frame and remember it.
    pub fn push(&mut self, frame: Frame) -> FramePair {
        let previous = self.last.replace(frame.clone());
        FramePair {
            previous,
            current: frame,
        }
    }

    /// Forget the held frame.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
