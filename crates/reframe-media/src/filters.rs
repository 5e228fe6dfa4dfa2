//! Crop/scale/pad filter.
//!
//! The cropper cuts the decided window out of the full-height source frame,
//! scales it to the output width and pads it vertically (centred, with
//! transparent black) to the output geometry. When the window is wider than
//! the output aspect the scaled image is shorter than the output and gets
//! letterboxed.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use reframe_models::CropWindow;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::metrics;
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Output frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
}

impl OutputGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Height of a `window_width`-wide, `source_height`-tall crop after
    /// scaling it to the output width, capped at the output height.
    pub fn scaled_height(&self, window_width: f64, source_height: u32) -> u32 {
        let h = (source_height as f64 * self.width as f64 / window_width.max(1.0)).round();
        (h as u32).clamp(1, self.height)
    }
}

/// Equivalent ffmpeg filter chain, for logs and external filter graphs.
pub fn build_filter_graph(window: CropWindow, source_height: u32, geometry: OutputGeometry) -> String {
    let scaled_h = geometry.scaled_height(window.width, source_height);
    format!(
        "crop={}:{}:{}:0,scale={}:{},pad={}:{}:0:(oh-ih)/2:color=black@0",
        window.width.round() as u32,
        source_height,
        window.x.round() as u32,
        geometry.width,
        scaled_h,
        geometry.width,
        geometry.height
    )
}

/// A crop/scale filter implementation.
pub trait CropFilter: Send + Sync {
    /// Produce the output frame for `window`.
    fn apply(&self, frame: &Frame, window: CropWindow, geometry: OutputGeometry) -> MediaResult<Frame>;
}

/// CPU filter built on `image::imageops`.
#[derive(Debug, Clone, Copy)]
pub struct SoftwareCropFilter {
    filter: FilterType,
}

impl SoftwareCropFilter {
    /// Bilinear scaling.
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for SoftwareCropFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CropFilter for SoftwareCropFilter {
    fn apply(&self, frame: &Frame, window: CropWindow, geometry: OutputGeometry) -> MediaResult<Frame> {
        if !window.x.is_finite() || !window.width.is_finite() || window.width < 1.0 {
            return Err(MediaError::filter_failed(format!("invalid window {}", window)));
        }
        if geometry.width == 0 || geometry.height == 0 {
            return Err(MediaError::filter_failed("empty output geometry"));
        }

        // Sub-pixel slack at either edge is rounding noise, anything more is
        // a window outside the frame.
        if window.x < -0.5 || window.right() > frame.width as f64 + 0.5 {
            return Err(MediaError::filter_failed(format!(
                "window {} outside {}px source",
                window, frame.width
            )));
        }
        let x0 = (window.x.floor().max(0.0) as u32).min(frame.width.saturating_sub(1));
        let w = (window.width.round() as u32).min(frame.width - x0);
        if w == 0 {
            return Err(MediaError::filter_failed(format!("window {} is empty", window)));
        }

        // Bilinear scaling is per channel, so BGRA can travel as RGBA.
        let source = RgbaImage::from_raw(frame.width, frame.height, frame.packed_data().into_owned())
            .ok_or_else(|| MediaError::filter_failed("frame buffer does not match dimensions"))?;

        let cropped = imageops::crop_imm(&source, x0, 0, w, frame.height).to_image();
        let scaled_h = geometry.scaled_height(w as f64, frame.height);
        let scaled = imageops::resize(&cropped, geometry.width, scaled_h, self.filter);

        let mut canvas = RgbaImage::new(geometry.width, geometry.height);
        let top = (geometry.height - scaled_h) / 2;
        imageops::replace(&mut canvas, &scaled, 0, top as i64);

        Frame::from_bgra(geometry.width, geometry.height, frame.pts, canvas.into_raw())
    }
}

/// Applies a [`CropFilter`], passing the source frame through on failure.
pub struct Cropper {
    filter: Box<dyn CropFilter>,
    geometry: OutputGeometry,
}

impl Cropper {
    pub fn new(filter: Box<dyn CropFilter>, geometry: OutputGeometry) -> Self {
        Self { filter, geometry }
    }

    /// Cropper with the software filter.
    pub fn software(geometry: OutputGeometry) -> Self {
        Self::new(Box::new(SoftwareCropFilter::new()), geometry)
    }

    pub fn geometry(&self) -> OutputGeometry {
        self.geometry
    }

    /// Crop `frame` to `window`.
    ///
    /// A filter error is logged and counted; the original frame is returned
    /// unchanged so the output stream never stalls.
    pub fn crop(&self, frame: Frame, window: CropWindow) -> Frame {
        match self.filter.apply(&frame, window, self.geometry) {
            Ok(out) => out,
            Err(e) => {
                warn!(
                    pts = frame.pts,
                    window = %window,
                    filter = %build_filter_graph(window, frame.height, self.geometry),
                    error = %e,
                    "Crop filter failed, passing frame through"
                );
                metrics::record_filter_failure();
                frame
            }
        }
    }
}

impl std::fmt::Debug for Cropper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cropper")
            .field("geometry", &self.geometry)
            .finish()
    }
}

/// Log the filter chain for a window at debug level.
pub fn log_filter(window: CropWindow, source_height: u32, geometry: OutputGeometry) {
    debug!(filter = %build_filter_graph(window, source_height, geometry), "Crop filter");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped_source() -> Frame {
        // Left half blue, right half red (BGRA).
        let (w, h) = (16u32, 8u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                if x < w / 2 {
                    data.extend_from_slice(&[255, 0, 0, 255]);
                } else {
                    data.extend_from_slice(&[0, 0, 255, 255]);
                }
            }
        }
        Frame::from_bgra(w, h, 3, data).unwrap()
    }

    #[test]
    fn test_square_crop_fills_output() {
        let filter = SoftwareCropFilter::new();
        let out = filter
            .apply(&striped_source(), CropWindow::new(8.0, 8.0), OutputGeometry::new(4, 4))
            .unwrap();
        assert_eq!((out.width, out.height), (4, 4));
        assert_eq!(out.pts, 3);
        for px in out.data.chunks_exact(4) {
            assert_eq!(px, &[0, 0, 255, 255]);
        }
    }

    #[test]
    fn test_wide_crop_is_letterboxed() {
        let filter = SoftwareCropFilter::new();
        let out = filter
            .apply(&striped_source(), CropWindow::new(0.0, 16.0), OutputGeometry::new(8, 8))
            .unwrap();
        // 16x8 scaled to width 8 is 8x4, padded 2 rows top and bottom.
        assert_eq!(out.row(0), &[0u8; 32][..]);
        assert_eq!(out.row(7), &[0u8; 32][..]);
        assert_eq!(out.row(3)[3], 255);
    }

    #[test]
    fn test_scaled_height() {
        let geometry = OutputGeometry::new(1080, 1080);
        assert_eq!(geometry.scaled_height(1080.0, 1080), 1080);
        assert_eq!(geometry.scaled_height(1920.0, 1080), 608);
        assert_eq!(geometry.scaled_height(500.0, 1080), 1080);
    }

    #[test]
    fn test_filter_graph() {
        let graph = build_filter_graph(
            CropWindow::new(420.0, 1080.0),
            1080,
            OutputGeometry::new(1080, 1080),
        );
        assert_eq!(graph, "crop=1080:1080:420:0,scale=1080:1080,pad=1080:1080:0:(oh-ih)/2:color=black@0");
    }

    #[test]
    fn test_fractional_window_at_right_edge() {
        // x and width both end in .5: rounding each up would overrun by a pixel.
        let filter = SoftwareCropFilter::new();
        let window = CropWindow::new(2.5, 13.5);
        assert_eq!(window.right(), 16.0);
        let out = filter
            .apply(&striped_source(), window, OutputGeometry::new(4, 4))
            .unwrap();
        assert_eq!((out.width, out.height), (4, 4));

        let wide = Frame::solid(1920, 8, 0, [0, 0, 0, 255]);
        let out = filter
            .apply(&wide, CropWindow::new(154.5, 1765.5), OutputGeometry::new(8, 8))
            .unwrap();
        assert_eq!((out.width, out.height), (8, 8));
    }

    #[test]
    fn test_cropper_passes_through_on_failure() {
        let cropper = Cropper::software(OutputGeometry::new(4, 4));
        let source = striped_source();
        let out = cropper.crop(source.clone(), CropWindow::new(12.0, 8.0));
        assert_eq!(out, source);
    }
}
