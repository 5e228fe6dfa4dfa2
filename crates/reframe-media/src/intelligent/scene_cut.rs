//! Scene-change scoring.
//!
//! The score is on a 0-100 scale and follows the usual `scdet` definition:
//!
//! 1. `mafd` = mean absolute difference of the colour samples of two
//!    consecutive frames, as a percentage of the sample range
//! 2. score = `min(mafd, |mafd - previous mafd|)`
//!
//! Taking the minimum suppresses sustained motion (a pan keeps `mafd` high
//! but its change small) while still scoring a hard cut highly.

use rayon::prelude::*;

use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Scores the visual discontinuity between two consecutive frames.
pub trait SceneScorer: Send {
    /// Score `current` against `previous`, 0-100.
    fn score(&mut self, previous: &Frame, current: &Frame) -> MediaResult<f64>;

    /// Forget any state carried between calls.
    fn reset(&mut self) {}
}

/// Mean-absolute-frame-difference scorer.
#[derive(Debug, Default, Clone)]
pub struct ScdetScorer {
    prev_mafd: f64,
}

impl ScdetScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean absolute difference over B, G and R, in percent of 256 levels.
    pub fn mafd(previous: &Frame, current: &Frame) -> MediaResult<f64> {
        if previous.width != current.width || previous.height != current.height {
            return Err(MediaError::scene_score(format!(
                "frame size changed from {}x{} to {}x{}",
                previous.width, previous.height, current.width, current.height
            )));
        }
        let samples = previous.width as u64 * previous.height as u64 * 3;
        if samples == 0 {
            return Ok(0.0);
        }

        let sad: u64 = (0..current.height)
            .into_par_iter()
            .map(|y| {
                previous
                    .row(y)
                    .chunks_exact(4)
                    .zip(current.row(y).chunks_exact(4))
                    .map(|(a, b)| {
                        (0..3)
                            .map(|c| (a[c] as i32 - b[c] as i32).unsigned_abs() as u64)
                            .sum::<u64>()
                    })
                    .sum::<u64>()
            })
            .sum();

        Ok(sad as f64 * 100.0 / samples as f64 / 256.0)
    }
}

impl SceneScorer for ScdetScorer {
    fn score(&mut self, previous: &Frame, current: &Frame) -> MediaResult<f64> {
        let mafd = Self::mafd(previous, current)?;
        let diff = (mafd - self.prev_mafd).abs();
        self.prev_mafd = mafd;
        Ok(mafd.min(diff).clamp(0.0, 100.0))
    }

    fn reset(&mut self) {
        self.prev_mafd = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_frames_score_zero() {
        let mut scorer = ScdetScorer::new();
        let a = Frame::solid(8, 4, 0, [40, 80, 120, 255]);
        assert_eq!(scorer.score(&a, &a.clone()).unwrap(), 0.0);
    }

    #[test]
    fn test_hard_cut_scores_high() {
        let mut scorer = ScdetScorer::new();
        let black = Frame::solid(8, 4, 0, [0, 0, 0, 255]);
        let white = Frame::solid(8, 4, 1, [255, 255, 255, 255]);
        let score = scorer.score(&black, &white).unwrap();
        assert!(score > 99.0);
        assert!(score > 14.0);
    }

    #[test]
    fn test_sustained_change_is_suppressed() {
        let mut scorer = ScdetScorer::new();
        let a = Frame::solid(8, 4, 0, [0, 0, 0, 255]);
        let b = Frame::solid(8, 4, 1, [64, 64, 64, 255]);
        let first = scorer.score(&a, &b).unwrap();
        // Same amount of change again: mafd is unchanged, so the score drops.
        let second = scorer.score(&b, &a).unwrap();
        assert!(first > 20.0);
        assert_eq!(second, 0.0);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let a = Frame::solid(4, 4, 0, [10, 10, 10, 0]);
        let b = Frame::solid(4, 4, 0, [10, 10, 10, 255]);
        assert_eq!(ScdetScorer::mafd(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_size_mismatch() {
        let a = Frame::solid(4, 4, 0, [0; 4]);
        let b = Frame::solid(8, 4, 0, [0; 4]);
        let err = ScdetScorer::mafd(&a, &b).unwrap_err();
        assert!(!err.is_fatal());
    }
}
