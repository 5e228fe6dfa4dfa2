#![deny(unreachable_patterns)]
//! Live auto-reframing engine.
//!
//! This crate provides:
//! - Capture format adaptation into packed BGRA frames
//! - Scene-cut scoring and cadence-driven subject detection on a worker thread
//! - Region prioritization, crop window solving and acceleration-limited smoothing
//! - A lookback buffer that reprocesses the frames before a cut with their own shot's context
//! - Crop/scale/letterbox filtering
//! - Metrics and timing telemetry

pub mod core;
pub mod detection;
pub mod error;
pub mod filters;
pub mod frame;
pub mod intelligent;

pub use crate::core::{FrameRateMonitor, TimingTelemetry};
pub use detection::{
    CompositeDetector, DetectionHandle, FaceModel, NullDetector, ObjectModel, SubjectDetector,
};
pub use error::{MediaError, MediaResult};
pub use filters::{CropFilter, Cropper, OutputGeometry, SoftwareCropFilter};
pub use frame::{CaptureFrame, FormatAdapter, Frame, PixelFormat};
pub use intelligent::{CropDecision, ReframeConfig, ReframedFrame, Reframer};
