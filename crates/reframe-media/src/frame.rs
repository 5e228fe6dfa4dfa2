//! Frames and capture format adaptation.
//!
//! Every stage after the [`FormatAdapter`] works on tightly packed 8-bit
//! BGRA [`Frame`]s. Capture devices deliver one of a few raw layouts; the
//! adapter re-packs them into a freshly allocated buffer so the capture
//! buffer can be recycled immediately.

use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{MediaError, MediaResult};

/// Raw pixel layouts understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit B, G, R, A.
    Bgra,
    /// 8-bit B, G, R and a padding byte.
    Bgrx,
    /// Packed 4:2:2, U Y0 V Y1 per pixel pair (BT.709, limited range).
    Uyvy422,
}

impl PixelFormat {
    /// Minimum bytes per row for `width` pixels.
    pub fn row_bytes(&self, width: u32) -> usize {
        match self {
            PixelFormat::Bgra | PixelFormat::Bgrx => width as usize * 4,
            PixelFormat::Uyvy422 => width.div_ceil(2) as usize * 4,
        }
    }

    /// Name as used by `ffmpeg -pix_fmt`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Bgra => "bgra",
            PixelFormat::Bgrx => "bgr0",
            PixelFormat::Uyvy422 => "uyvy422",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PixelFormat {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bgra" => Ok(PixelFormat::Bgra),
            "bgrx" | "bgr0" => Ok(PixelFormat::Bgrx),
            "uyvy" | "uyvy422" => Ok(PixelFormat::Uyvy422),
            other => Err(MediaError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A frame in the pipeline's internal representation.
///
/// Always [`PixelFormat::Bgra`]; `stride` may exceed `width * 4` only for
/// frames built by hand (the adapter and the cropper emit packed rows).
/// Pixels are shared: cloning a frame does not copy them.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub format: PixelFormat,
    /// Presentation timestamp in stream time-base units.
    pub pts: i64,
}

impl Frame {
    /// Wrap a packed BGRA buffer.
    pub fn from_bgra(width: u32, height: u32, pts: i64, data: Vec<u8>) -> MediaResult<Self> {
        let stride = width as usize * 4;
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(MediaError::UnexpectedFrameSize {
                expected_width: width,
                expected_height: height,
                expected_bytes: expected,
                actual_width: width,
                actual_height: height,
                actual_bytes: data.len(),
            });
        }
        Ok(Self {
            data: data.into(),
            width,
            height,
            stride,
            format: PixelFormat::Bgra,
            pts,
        })
    }

    /// A frame filled with one BGRA colour.
    pub fn solid(width: u32, height: u32, pts: i64, bgra: [u8; 4]) -> Self {
        let data = bgra
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect::<Vec<u8>>()
            .into();
        Self {
            data,
            width,
            height,
            stride: width as usize * 4,
            format: PixelFormat::Bgra,
            pts,
        }
    }

    /// Pixel bytes of row `y`, without stride padding.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * 4]
    }

    /// Returns true if rows carry no padding.
    pub fn is_packed(&self) -> bool {
        self.stride == self.width as usize * 4
    }

    /// Pixels without stride padding. Borrowed when the rows are packed.
    pub fn packed_data(&self) -> Cow<'_, [u8]> {
        if self.is_packed() {
            return Cow::Borrowed(&self.data[..]);
        }
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        Cow::Owned(out)
    }

    /// Convert to packed RGB for the detection models.
    pub fn to_rgb(&self) -> RgbImage {
        let width = self.width as usize;
        let mut rgb = vec![0u8; width * self.height as usize * 3];
        rgb.par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(y, out_row)| {
                let row = self.row(y as u32);
                for (dst, src) in out_row.chunks_exact_mut(3).zip(row.chunks_exact(4)) {
                    dst[0] = src[2];
                    dst[1] = src[1];
                    dst[2] = src[0];
                }
            });
        // Buffer length matches the dimensions by construction.
        RgbImage::from_raw(self.width, self.height, rgb).unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("pts", &self.pts)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// A frame as delivered by a capture device.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row; `0` means packed rows.
    pub stride: usize,
    pub layout: PixelFormat,
    pub pts: i64,
}

impl CaptureFrame {
    /// Packed capture frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, layout: PixelFormat, pts: i64) -> Self {
        Self {
            data,
            width,
            height,
            stride: 0,
            layout,
            pts,
        }
    }

    /// Effective row stride.
    pub fn row_stride(&self) -> usize {
        if self.stride == 0 {
            self.layout.row_bytes(self.width)
        } else {
            self.stride
        }
    }
}

/// Converts capture frames into internal [`Frame`]s.
///
/// The adapter is bound to one capture geometry. A frame of any other size
/// is a fatal configuration mismatch.
#[derive(Debug, Clone)]
pub struct FormatAdapter {
    width: u32,
    height: u32,
    layout: PixelFormat,
}

impl FormatAdapter {
    pub fn new(width: u32, height: u32, layout: PixelFormat) -> Self {
        Self {
            width,
            height,
            layout,
        }
    }

    /// Expected capture layout.
    pub fn layout(&self) -> PixelFormat {
        self.layout
    }

    /// Bytes in one packed capture frame.
    pub fn capture_frame_bytes(&self) -> usize {
        self.layout.row_bytes(self.width) * self.height as usize
    }

    /// Convert one capture frame.
    pub fn adapt(&self, capture: &CaptureFrame) -> MediaResult<Frame> {
        self.check_size(capture)?;
        if capture.layout != self.layout {
            return Err(MediaError::UnsupportedFormat(format!(
                "capture delivered {}, adapter expects {}",
                capture.layout, self.layout
            )));
        }

        let width = self.width as usize;
        let in_stride = capture.row_stride();
        let out_stride = width * 4;
        let mut out = vec![0u8; out_stride * self.height as usize];

        match self.layout {
            PixelFormat::Bgra => {
                out.par_chunks_mut(out_stride)
                    .enumerate()
                    .for_each(|(y, dst)| {
                        let start = y * in_stride;
                        dst.copy_from_slice(&capture.data[start..start + out_stride]);
                    });
            }
            PixelFormat::Bgrx => {
                out.par_chunks_mut(out_stride)
                    .enumerate()
                    .for_each(|(y, dst)| {
                        let start = y * in_stride;
                        dst.copy_from_slice(&capture.data[start..start + out_stride]);
                        for px in dst.chunks_exact_mut(4) {
                            px[3] = 255;
                        }
                    });
            }
            PixelFormat::Uyvy422 => {
                out.par_chunks_mut(out_stride)
                    .enumerate()
                    .for_each(|(y, dst)| {
                        let start = y * in_stride;
                        let src = &capture.data[start..start + self.layout.row_bytes(self.width)];
                        uyvy_row_to_bgra(src, dst);
                    });
            }
        }

        Ok(Frame {
            data: out.into(),
            width: self.width,
            height: self.height,
            stride: out_stride,
            format: PixelFormat::Bgra,
            pts: capture.pts,
        })
    }

    fn check_size(&self, capture: &CaptureFrame) -> MediaResult<()> {
        let min_stride = capture.layout.row_bytes(capture.width);
        let stride = capture.row_stride();
        let needed = if capture.height == 0 {
            0
        } else {
            stride * (capture.height as usize - 1) + min_stride
        };
        if capture.width != self.width
            || capture.height != self.height
            || stride < min_stride
            || capture.data.len() < needed
        {
            return Err(MediaError::UnexpectedFrameSize {
                expected_width: self.width,
                expected_height: self.height,
                expected_bytes: self.capture_frame_bytes(),
                actual_width: capture.width,
                actual_height: capture.height,
                actual_bytes: capture.data.len(),
            });
        }
        Ok(())
    }
}

/// Convert one UYVY row to BGRA using BT.709 limited-range coefficients.
fn uyvy_row_to_bgra(src: &[u8], dst: &mut [u8]) {
    for (pair, out) in src.chunks_exact(4).zip(dst.chunks_mut(8)) {
        let u = pair[0] as f32 - 128.0;
        let v = pair[2] as f32 - 128.0;
        let r_off = 1.792_741 * v;
        let g_off = -0.213_249 * u - 0.532_909 * v;
        let b_off = 2.112_402 * u;

        for (i, &luma) in [pair[1], pair[3]].iter().enumerate() {
            if out.len() < (i + 1) * 4 {
                break;
            }
            let y = 1.164_384 * (luma as f32 - 16.0);
            let px = &mut out[i * 4..i * 4 + 4];
            px[0] = clamp_u8(y + b_off);
            px[1] = clamp_u8(y + g_off);
            px[2] = clamp_u8(y + r_off);
            px[3] = 255;
        }
    }
}

#[inline]
fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
