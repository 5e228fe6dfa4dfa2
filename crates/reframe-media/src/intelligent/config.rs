//! Configuration for the reframing pipeline.

use reframe_models::AspectRatio;
use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};
use crate::filters::OutputGeometry;

/// Configuration for the reframing pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReframeConfig {
    // === Geometry ===
    /// Capture width in pixels (default: 1920)
    pub source_width: u32,

    /// Capture height in pixels (default: 1080)
    pub source_height: u32,

    /// Output aspect ratio; sets the crop width at full source height (default: 1:1)
    pub aspect: AspectRatio,

    /// Output frame width (default: 1080)
    pub output_width: u32,

    /// Output frame height (default: 1080)
    pub output_height: u32,

    // === Lookback ===
    /// Frames held back before emitting, so a cut can be reprocessed (default: 6)
    pub lookback_frames: usize,

    /// Detection-bearing analyses kept since the last cut (default: 50)
    pub max_history: usize,

    /// Most recent detections used when the whole history is too wide (default: 10)
    pub recent_detections: usize,

    // === Analysis ===
    /// Run detection on every Nth frame (default: 5)
    pub detection_cadence: u32,

    /// Scene-change score above which a cut is declared, 0-100 (default: 14.0)
    pub scene_threshold: f64,

    // === Solver ===
    /// Extra width added around a span that does not fit (default: 0.1)
    pub widen_margin: f64,

    /// Fraction of the span placed left of the window centre when widening (default: 0.55)
    pub trailing_bias: f64,

    // === Smoothing ===
    /// Maximum speed-up in pixels per frame squared (default: 2.0)
    pub max_accel: f64,

    /// Maximum slow-down in pixels per frame squared (default: 3.0)
    pub max_decel: f64,
}

impl Default for ReframeConfig {
    fn default() -> Self {
        Self {
            source_width: 1920,
            source_height: 1080,
            aspect: AspectRatio::SQUARE,
            output_width: 1080,
            output_height: 1080,
            lookback_frames: 6,
            max_history: 50,
            recent_detections: 10,
            detection_cadence: 5,
            scene_threshold: 14.0,
            widen_margin: 0.1,
            trailing_bias: 0.55,
            max_accel: 2.0,
            max_decel: 3.0,
        }
    }
}

impl ReframeConfig {
    /// Square output for social feeds from an HD programme feed.
    pub fn broadcast() -> Self {
        Self::default()
    }

    /// Vertical 9:16 output.
    pub fn portrait() -> Self {
        Self {
            aspect: AspectRatio::PORTRAIT,
            output_width: 1080,
            output_height: 1920,
            ..Self::default()
        }
    }

    /// Faster reaction at the cost of more visible motion.
    pub fn responsive() -> Self {
        Self {
            detection_cadence: 3,
            max_accel: 4.0,
            max_decel: 6.0,
            ..Self::default()
        }
    }

    /// Slower, steadier camera for talk shows.
    pub fn smooth() -> Self {
        Self {
            lookback_frames: 10,
            max_accel: 1.0,
            max_decel: 2.0,
            ..Self::default()
        }
    }

    /// Crop width at full source height for the configured aspect ratio.
    pub fn target_width(&self) -> f64 {
        self.aspect
            .crop_width_for(self.source_width, self.source_height)
    }

    pub fn source_width_f64(&self) -> f64 {
        self.source_width as f64
    }

    /// Output frame geometry.
    pub fn output_geometry(&self) -> OutputGeometry {
        OutputGeometry::new(self.output_width, self.output_height)
    }

    /// Depth at which draining is forced regardless of downstream capacity.
    pub fn forced_drain_depth(&self) -> usize {
        self.lookback_frames * 2
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> MediaResult<()> {
        if self.source_width == 0 || self.source_height == 0 {
            return Err(MediaError::invalid_config("source dimensions must be non-zero"));
        }
        if self.source_width % 2 != 0 {
            return Err(MediaError::invalid_config("source width must be even"));
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(MediaError::invalid_config("output dimensions must be non-zero"));
        }
        if self.lookback_frames == 0 {
            return Err(MediaError::invalid_config("lookback_frames must be at least 1"));
        }
        if self.detection_cadence == 0 {
            return Err(MediaError::invalid_config("detection_cadence must be at least 1"));
        }
        if self.max_history == 0 || self.recent_detections == 0 {
            return Err(MediaError::invalid_config("detection history limits must be at least 1"));
        }
        if !(0.0..=100.0).contains(&self.scene_threshold) {
            return Err(MediaError::invalid_config(format!(
                "scene_threshold {} outside 0-100",
                self.scene_threshold
            )));
        }
        if !(self.max_accel > 0.0 && self.max_decel > 0.0) {
            return Err(MediaError::invalid_config("max_accel and max_decel must be positive"));
        }
        if !(0.0..=1.0).contains(&self.trailing_bias) || self.widen_margin < 0.0 {
            return Err(MediaError::invalid_config("widen_margin or trailing_bias out of range"));
        }
        Ok(())
    }
}
