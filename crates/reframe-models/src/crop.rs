//! Crop windows and output aspect ratios.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Horizontal crop window in source-frame coordinates.
///
/// The crop height is implied by the output aspect ratio and the window is
/// always vertically centred, so only the horizontal extent is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropWindow {
    /// Left edge in source pixels.
    pub x: f64,
    /// Width in source pixels.
    pub width: f64,
}

impl CropWindow {
    pub fn new(x: f64, width: f64) -> Self {
        Self { x, width }
    }

    /// A `width`-wide window centred in a `source_width`-wide frame.
    pub fn centered(source_width: f64, width: f64) -> Self {
        let width = width.min(source_width);
        Self {
            x: (source_width - width) / 2.0,
            width,
        }
    }

    /// Right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Horizontal centre.
    #[inline]
    pub fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Clamp into `[0, source_width]`: width first, then position.
    pub fn clamped(&self, source_width: f64) -> Self {
        let width = if self.width.is_finite() {
            self.width.clamp(1.0, source_width)
        } else {
            source_width
        };
        let max_x = source_width - width;
        let x = if self.x.is_finite() {
            self.x.clamp(0.0, max_x)
        } else {
            max_x / 2.0
        };
        Self { x, width }
    }

    /// Returns true if `0 <= x` and `x + width <= source_width`.
    pub fn is_within(&self, source_width: f64) -> bool {
        self.x >= 0.0 && self.right() <= source_width + f64::EPSILON * source_width
    }
}

impl fmt::Display for CropWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={:.1} w={:.1}", self.x, self.width)
    }
}

/// Output aspect ratio as `width:height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio { width: 1, height: 1 };
    pub const PORTRAIT: AspectRatio = AspectRatio { width: 9, height: 16 };
    pub const INSTAGRAM: AspectRatio = AspectRatio { width: 4, height: 5 };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Width of a full-height crop of a `source_height` frame, capped at the
    /// source width.
    pub fn crop_width_for(&self, source_width: u32, source_height: u32) -> f64 {
        (source_height as f64 * self.ratio()).min(source_width as f64)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::SQUARE
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| AspectRatioParseError(s.to_string()))?;
        let width: u32 = w.trim().parse().map_err(|_| AspectRatioParseError(s.to_string()))?;
        let height: u32 = h.trim().parse().map_err(|_| AspectRatioParseError(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(AspectRatioParseError(s.to_string()));
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Error)]
#[error("Invalid aspect ratio (expected W:H): {0}")]
pub struct AspectRatioParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered() {
        let window = CropWindow::centered(1920.0, 1080.0);
        assert_eq!(window.x, 420.0);
        assert_eq!(window.right(), 1500.0);
        assert_eq!(window.center(), 960.0);
    }

    #[test]
    fn test_clamped() {
        let window = CropWindow::new(-50.0, 1080.0).clamped(1920.0);
        assert_eq!(window.x, 0.0);

        let window = CropWindow::new(1000.0, 1080.0).clamped(1920.0);
        assert_eq!(window.x, 840.0);
        assert!(window.is_within(1920.0));

        let window = CropWindow::new(10.0, 2500.0).clamped(1920.0);
        assert_eq!(window.width, 1920.0);
        assert_eq!(window.x, 0.0);

        let window = CropWindow::new(f64::NAN, 1080.0).clamped(1920.0);
        assert_eq!(window.x, 420.0);
    }

    #[test]
    fn test_aspect_ratio() {
        let ratio: AspectRatio = "9:16".parse().unwrap();
        assert_eq!(ratio, AspectRatio::PORTRAIT);
        assert!((ratio.crop_width_for(1920, 1080) - 607.5).abs() < 1e-9);
        assert_eq!(AspectRatio::SQUARE.crop_width_for(1920, 1080), 1080.0);
        assert!("16x9".parse::<AspectRatio>().is_err());
        assert!("0:9".parse::<AspectRatio>().is_err());
    }
}
