//! Shared data models for the live reframing engine.
//!
//! This crate provides Serde-serializable types for:
//! - Subject classes and per-class detection counts
//! - Detection regions produced by the detection worker
//! - Crop windows and output aspect ratios
//! - Manual override commands from the operator control channel

pub mod control;
pub mod crop;
pub mod region;
pub mod subject;

// Re-export common types
pub use control::{Override, OverrideCommand};
pub use crop::{AspectRatio, AspectRatioParseError, CropWindow};
pub use region::{DetectionOutput, DetectionRegion};
pub use subject::{ClassCounts, ClassSet, SubjectClass, SubjectClassParseError};
