//! The reframing pipeline.
//!
//! [`Reframer`] advances one frame at a time:
//!
//! ```text
//! frame -> pairing -> analyzer -> lookback buffer -> planner -> smoother -> cropper
//! ```
//!
//! All mutable decision state lives in [`PipelineState`], owned by the
//! reframer and therefore by whichever task drives it. Override commands
//! arrive by message and are applied between frames.

use reframe_models::{CropWindow, Override, OverrideCommand};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::analyzer::{AnalysisResult, SceneAnalyzer};
use super::config::ReframeConfig;
use super::crop_planner::CropPlanner;
use super::history::DetectionHistory;
use super::pairing::PairingStage;
use super::reframe_buffer::ReframeBuffer;
use super::scene_cut::ScdetScorer;
use super::smoother::{AccelLimiter, AccelState};
use crate::core::metrics;
use crate::core::observability::TimingTelemetry;
use crate::detection::{DetectionHandle, SubjectDetector};
use crate::error::MediaResult;
use crate::filters::{self, CropFilter, Cropper};
use crate::frame::Frame;

/// The crop chosen for one emitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropDecision {
    pub pts: i64,
    /// Solver output before override and smoothing.
    pub raw: CropWindow,
    /// Window actually used for the crop.
    pub window: CropWindow,
    /// The frame is the first of a new shot.
    pub scene_cut: bool,
    /// An operator override was active.
    pub overridden: bool,
}

/// A cropped output frame and how it was cropped.
#[derive(Debug, Clone)]
pub struct ReframedFrame {
    pub frame: Frame,
    pub decision: CropDecision,
}

/// Decision state carried from frame to frame.
///
/// Everything except the buffer and history is reset on a scene cut.
#[derive(Debug)]
pub struct PipelineState {
    x: AccelLimiter,
    width: AccelLimiter,
    reference: Option<CropWindow>,
    manual: Override,
    buffer: ReframeBuffer,
    history: DetectionHistory,
}

impl PipelineState {
    pub fn new(config: &ReframeConfig) -> Self {
        Self {
            x: AccelLimiter::new(config.max_accel, config.max_decel),
            width: AccelLimiter::new(config.max_accel, config.max_decel),
            reference: None,
            manual: Override::default(),
            buffer: ReframeBuffer::new(config.lookback_frames),
            history: DetectionHistory::new(config.max_history),
        }
    }

    /// Smoother state for the crop position.
    pub fn x_state(&self) -> Option<AccelState> {
        self.x.state()
    }

    /// Smoother state for the crop width.
    pub fn width_state(&self) -> Option<AccelState> {
        self.width.state()
    }

    /// Previous raw window of this shot.
    pub fn reference(&self) -> Option<CropWindow> {
        self.reference
    }

    pub fn manual_override(&self) -> Override {
        self.manual
    }

    pub fn buffer_depth(&self) -> usize {
        self.buffer.len()
    }

    pub fn history(&self) -> &DetectionHistory {
        &self.history
    }

    fn reset_for_cut(&mut self) {
        self.history.clear();
        self.x.reset();
        self.width.reset();
        self.reference = None;
        self.manual.clear();
    }
}

/// Drives frames through analysis, buffering, solving and cropping.
pub struct Reframer {
    config: ReframeConfig,
    pairing: PairingStage,
    analyzer: SceneAnalyzer,
    planner: CropPlanner,
    cropper: Cropper,
    state: PipelineState,
    telemetry: TimingTelemetry,
}

impl Reframer {
    /// Build a reframer. Fails if the configuration is invalid.
    pub fn new(config: ReframeConfig, analyzer: SceneAnalyzer, cropper: Cropper) -> MediaResult<Self> {
        config.validate()?;
        info!(
            source = format!("{}x{}", config.source_width, config.source_height),
            output = format!("{}x{}", config.output_width, config.output_height),
            aspect = %config.aspect,
            lookback = config.lookback_frames,
            cadence = config.detection_cadence,
            "Reframer ready"
        );
        Ok(Self {
            planner: CropPlanner::new(&config),
            state: PipelineState::new(&config),
            pairing: PairingStage::new(),
            telemetry: TimingTelemetry::default(),
            config,
            analyzer,
            cropper,
        })
    }

    /// Start the detection worker and build a reframer around it, using the
    /// `scdet`-style scene scorer.
    pub async fn start(
        config: ReframeConfig,
        detector: Box<dyn SubjectDetector>,
        filter: Box<dyn CropFilter>,
    ) -> MediaResult<Self> {
        config.validate()?;
        let handle = DetectionHandle::start(detector).await?;
        let analyzer = SceneAnalyzer::new(
            Box::new(ScdetScorer::new()),
            handle,
            config.scene_threshold,
            config.detection_cadence,
        );
        let cropper = Cropper::new(filter, config.output_geometry());
        Self::new(config, analyzer, cropper)
    }

    pub fn config(&self) -> &ReframeConfig {
        &self.config
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Apply an operator override. Takes effect from the next emitted frame.
    pub fn apply_override(&mut self, command: OverrideCommand) {
        self.state.manual.apply(
            command,
            self.planner.source_width(),
            self.planner.target_width(),
        );
        debug!(?command, active = self.state.manual.is_active(), "Override updated");
    }

    /// Ingest one frame and return any frames ready for output.
    ///
    /// `downstream_capacity` is how many frames the sink can take without
    /// blocking. A scene cut, or a buffer past twice its lookback depth,
    /// drains regardless of it.
    pub async fn push(&mut self, frame: Frame, downstream_capacity: usize) -> MediaResult<Vec<ReframedFrame>> {
        metrics::record_frame_ingested();

        let pair = self.pairing.push(frame);
        let timer = self.telemetry.start("analyse");
        let result = self.analyzer.analyse(pair).await?;
        timer.finish(&mut self.telemetry);

        let mut out = Vec::new();
        if result.analysis.scene_change {
            let backlog = self.state.buffer.drain_all();
            info!(
                pts = result.analysis.pts,
                score = format!("{:.1}", result.analysis.scene_score),
                flushed = backlog.len(),
                "Scene cut, flushing backlog"
            );
            for entry in backlog {
                out.push(self.emit(entry));
            }
            self.state.reset_for_cut();
        }

        self.buffer(result);

        let count = self.state.buffer.drain_count(downstream_capacity);
        if self.state.buffer.is_overfull() {
            metrics::record_forced_drain();
            debug!(depth = self.state.buffer.len(), draining = count, "Forced drain");
        }
        for _ in 0..count {
            if let Some(entry) = self.state.buffer.pop() {
                out.push(self.emit(entry));
            }
        }

        self.finish_step(out.len());
        Ok(out)
    }

    /// Emit every buffered frame. Used at end of stream and on shutdown.
    pub fn flush(&mut self) -> Vec<ReframedFrame> {
        let backlog = self.state.buffer.drain_all();
        info!(frames = backlog.len(), "Flushing reframe buffer");
        let out: Vec<ReframedFrame> = backlog.into_iter().map(|e| self.emit(e)).collect();
        self.finish_step(out.len());
        out
    }

    /// Stop the detection worker.
    pub fn shutdown(&mut self) {
        self.analyzer.shutdown();
    }

    fn buffer(&mut self, result: AnalysisResult) {
        if let Some(detection) = result.analysis.detection.as_ref() {
            self.state.history.push(detection.clone());
        }
        self.state.buffer.push(result);
    }

    fn emit(&mut self, entry: AnalysisResult) -> ReframedFrame {
        let timer = self.telemetry.start("plan");
        let raw = self.planner.plan(&self.state.history, self.state.reference);
        self.state.reference = Some(raw);

        let manual = self.state.manual;
        let target_x = manual.x.unwrap_or(raw.x);
        let target_width = manual.width.unwrap_or(raw.width);
        let x = self.state.x.step(target_x);
        let width = self.state.width.step(target_width);
        let window = CropWindow::new(x, width).clamped(self.planner.source_width());
        timer.finish(&mut self.telemetry);

        filters::log_filter(window, entry.frame.height, self.cropper.geometry());

        let timer = self.telemetry.start("crop");
        let frame = self.cropper.crop(entry.frame, window);
        timer.finish(&mut self.telemetry);

        ReframedFrame {
            frame,
            decision: CropDecision {
                pts: entry.analysis.pts,
                raw,
                window,
                scene_cut: entry.analysis.scene_change,
                overridden: manual.is_active(),
            },
        }
    }

    fn finish_step(&mut self, emitted: usize) {
        if emitted > 0 {
            metrics::record_frames_emitted(emitted);
        }
        metrics::set_buffer_depth(self.state.buffer.len());
        self.telemetry.maybe_report(Instant::now());
    }
}
