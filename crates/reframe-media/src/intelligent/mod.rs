//! Automatic reframing.
//!
//! Decides, frame by frame, which horizontal window of the source to keep:
//!
//! 1. **Pairing**: each frame travels with its predecessor
//! 2. **Analysis**: scene-cut scoring on every frame, subject detection on a cadence
//! 3. **Lookback buffer**: frames wait a few frames so later detections inform
//!    the crop, and a cut can flush the old shot with its own context
//! 4. **Planning**: prioritization policy + crop window solver
//! 5. **Smoothing**: acceleration-limited position and width
//! 6. **Cropping**: crop, scale and letterbox to the output geometry

pub mod analyzer;
pub mod config;
pub mod crop_planner;
pub mod history;
pub mod pairing;
pub mod pipeline;
pub mod policy;
pub mod reframe_buffer;
pub mod scene_cut;
pub mod smoother;


pub use analyzer::{AnalysisResult, FrameAnalysis, SceneAnalyzer};
pub use config::ReframeConfig;
pub use crop_planner::{CropPlanner, Span};
pub use history::DetectionHistory;
pub use pairing::{FramePair, PairingStage};
pub use pipeline::{CropDecision, PipelineState, ReframedFrame, Reframer};
pub use policy::included_classes;
pub use reframe_buffer::{ReframeBuffer, ReframeBufferEntry};
pub use scene_cut::{ScdetScorer, SceneScorer};
pub use smoother::{AccelLimiter, AccelState};
