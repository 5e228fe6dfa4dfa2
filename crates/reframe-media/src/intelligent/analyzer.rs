//! Scene and subject analysis.
//!
//! Every frame gets a scene-change score against its predecessor. Subject
//! detection only runs on every Nth frame (the cadence), counted from the
//! last cut so that the first frame of a new shot is always analysed.

use reframe_models::DetectionOutput;
use tracing::{debug, warn};

use super::pairing::FramePair;
use super::scene_cut::SceneScorer;
use crate::core::metrics;
use crate::detection::DetectionHandle;
use crate::error::MediaResult;
use crate::frame::Frame;

/// What the analyzer learned about one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAnalysis {
    pub pts: i64,
    /// The frame starts a new shot.
    pub scene_change: bool,
    /// Scene-change score, 0-100 (0 for the first frame).
    pub scene_score: f64,
    /// Detection output; `None` on frames skipped by the cadence or where
    /// detection failed.
    pub detection: Option<DetectionOutput>,
}

impl FrameAnalysis {
    pub fn has_detection(&self) -> bool {
        self.detection.is_some()
    }
}

/// A frame together with its analysis.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub frame: Frame,
    pub analysis: FrameAnalysis,
}

/// Runs cut detection on every frame and subject detection on a cadence.
pub struct SceneAnalyzer {
    scorer: Box<dyn SceneScorer>,
    detector: DetectionHandle,
    threshold: f64,
    cadence: u64,
    counter: u64,
}

impl SceneAnalyzer {
    pub fn new(
        scorer: Box<dyn SceneScorer>,
        detector: DetectionHandle,
        threshold: f64,
        cadence: u32,
    ) -> Self {
        Self {
            scorer,
            detector,
            threshold,
            cadence: cadence.max(1) as u64,
            counter: 0,
        }
    }

    /// Frames processed since the last cut (or start).
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Analyse one frame pair.
    ///
    /// Detection and scoring failures are absorbed into the result. Only a
    /// fatal error (the worker has gone away) is returned.
    pub async fn analyse(&mut self, pair: FramePair) -> MediaResult<AnalysisResult> {
        let FramePair { previous, current } = pair;

        let scene_score = match previous.as_ref() {
            Some(previous) => match self.scorer.score(previous, &current) {
                Ok(score) => score,
                Err(e) => {
                    warn!(pts = current.pts, error = %e, "Scene scoring failed");
                    0.0
                }
            },
            None => 0.0,
        };
        let scene_change = previous.is_some() && scene_score > self.threshold;
        if scene_change {
            debug!(pts = current.pts, score = scene_score, "Scene cut");
            metrics::record_scene_cut();
            self.counter = 0;
        }

        let detection = if self.counter % self.cadence == 0 {
            match self.detector.analyse(current.to_rgb()).await {
                Ok(output) => {
                    self.counter += 1;
                    Some(output)
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Counter stays put so the next frame retries.
                    warn!(pts = current.pts, error = %e, "Detection failed");
                    None
                }
            }
        } else {
            self.counter += 1;
            None
        };

        Ok(AnalysisResult {
            analysis: FrameAnalysis {
                pts: current.pts,
                scene_change,
                scene_score,
                detection,
            },
            frame: current,
        })
    }

    /// Stop the detection worker.
    pub fn shutdown(&mut self) {
        self.detector.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SubjectDetector;
    use crate::error::MediaError;
    use crate::intelligent::pairing::PairingStage;
    use crate::intelligent::scene_cut::ScdetScorer;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails the calls whose (1-based) index is listed.
    struct ScriptedDetector {
        calls: Arc<AtomicUsize>,
        fail_on: Vec<usize>,
    }

    impl SubjectDetector for ScriptedDetector {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn initialize(&mut self) -> MediaResult<()> {
            Ok(())
        }
        fn detect(&mut self, _image: &RgbImage) -> MediaResult<DetectionOutput> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&n) {
                Err(MediaError::detection_failed("scripted failure"))
            } else {
                Ok(DetectionOutput::empty())
            }
        }
    }

    async fn analyzer(fail_on: Vec<usize>) -> (SceneAnalyzer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let detector = ScriptedDetector {
            calls: calls.clone(),
            fail_on,
        };
        let handle = DetectionHandle::start(Box::new(detector)).await.unwrap();
        (
            SceneAnalyzer::new(Box::new(ScdetScorer::new()), handle, 14.0, 5),
            calls,
        )
    }

    fn grey(pts: i64) -> Frame {
        Frame::solid(8, 4, pts, [90, 90, 90, 255])
    }

    #[tokio::test]
    async fn test_detection_cadence() {
        let (mut analyzer, calls) = analyzer(vec![]).await;
        let mut pairing = PairingStage::new();

        let mut detected = Vec::new();
        for pts in 0..11 {
            let result = analyzer.analyse(pairing.push(grey(pts))).await.unwrap();
            assert!(!result.analysis.scene_change);
            if result.analysis.has_detection() {
                detected.push(pts);
            }
        }
        assert_eq!(detected, vec![0, 5, 10]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_detection_retries_next_frame() {
        let (mut analyzer, calls) = analyzer(vec![1]).await;
        let mut pairing = PairingStage::new();

        let first = analyzer.analyse(pairing.push(grey(0))).await.unwrap();
        assert!(!first.analysis.has_detection());
        assert_eq!(analyzer.counter(), 0);

        let second = analyzer.analyse(pairing.push(grey(1))).await.unwrap();
        assert!(second.analysis.has_detection());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cut_resets_cadence() {
        let (mut analyzer, _calls) = analyzer(vec![]).await;
        let mut pairing = PairingStage::new();

        for pts in 0..3 {
            analyzer.analyse(pairing.push(grey(pts))).await.unwrap();
        }
        let cut = Frame::solid(8, 4, 3, [250, 250, 250, 255]);
        let result = analyzer.analyse(pairing.push(cut)).await.unwrap();
        assert!(result.analysis.scene_change);
        assert!(result.analysis.scene_score > 14.0);
        assert!(result.analysis.has_detection());
        assert_eq!(analyzer.counter(), 1);
    }
}
