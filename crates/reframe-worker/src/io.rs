//! Raw video input and output.
//!
//! Frames travel as headerless rawvideo, the way an `ffmpeg -f rawvideo`
//! pipe delivers them: a fixed number of bytes per frame, no framing.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::sync::Arc;

use reframe_media::{CaptureFrame, CropFilter, Frame, OutputGeometry, PixelFormat, SoftwareCropFilter};
use reframe_models::CropWindow;
use tracing::{debug, warn};

use crate::config::StreamEndpoint;
use crate::error::{WorkerError, WorkerResult};

/// Produces capture frames. Runs on a blocking thread.
pub trait FrameSource: Send {
    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> WorkerResult<Option<CaptureFrame>>;
}

/// Consumes output frames. Runs on a blocking thread.
pub trait FrameSink: Send {
    fn emit(&mut self, frame: &Frame) -> WorkerResult<()>;

    fn finish(&mut self) -> WorkerResult<()> {
        Ok(())
    }
}

/// Reads fixed-size rawvideo frames. Frame `n` gets pts `n`.
pub struct RawVideoSource<R> {
    reader: R,
    width: u32,
    height: u32,
    layout: PixelFormat,
    frame_bytes: usize,
    next_pts: i64,
}

impl<R: Read + Send> RawVideoSource<R> {
    pub fn new(reader: R, width: u32, height: u32, layout: PixelFormat) -> Self {
        Self {
            reader,
            width,
            height,
            layout,
            frame_bytes: layout.row_bytes(width) * height as usize,
            next_pts: 0,
        }
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Fill `buf` completely. Returns the number of bytes read, which is
    /// short only at end of stream.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read + Send> FrameSource for RawVideoSource<R> {
    fn next_frame(&mut self) -> WorkerResult<Option<CaptureFrame>> {
        let mut data = vec![0u8; self.frame_bytes];
        let got = self.fill(&mut data)?;
        if got == 0 {
            debug!(frames = self.next_pts, "End of input");
            return Ok(None);
        }
        if got < self.frame_bytes {
            return Err(WorkerError::TruncatedFrame {
                got,
                expected: self.frame_bytes,
            });
        }
        let pts = self.next_pts;
        self.next_pts += 1;
        Ok(Some(CaptureFrame::new(data, self.width, self.height, self.layout, pts)))
    }
}

/// Writes packed BGRA frames of one fixed geometry.
///
/// A frame of any other size (a crop that failed and passed its source
/// through) is letterboxed into the output geometry first so the byte
/// stream stays aligned. If even that fails, a black frame is written.
pub struct RawVideoSink<W> {
    writer: W,
    geometry: OutputGeometry,
    letterbox: SoftwareCropFilter,
    written: u64,
}

impl<W: Write + Send> RawVideoSink<W> {
    pub fn new(writer: W, geometry: OutputGeometry) -> Self {
        Self {
            writer,
            geometry,
            letterbox: SoftwareCropFilter::new(),
            written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn conform(&self, frame: &Frame) -> Arc<[u8]> {
        if frame.width == self.geometry.width && frame.height == self.geometry.height {
            return match frame.packed_data() {
                Cow::Borrowed(_) => Arc::clone(&frame.data),
                Cow::Owned(packed) => packed.into(),
            };
        }
        let full = CropWindow::new(0.0, frame.width as f64);
        match self.letterbox.apply(frame, full, self.geometry) {
            Ok(fitted) => fitted.data,
            Err(e) => {
                warn!(pts = frame.pts, error = %e, "Cannot fit frame to output, writing black");
                Frame::solid(self.geometry.width, self.geometry.height, frame.pts, [0, 0, 0, 255]).data
            }
        }
    }
}

impl<W: Write + Send> FrameSink for RawVideoSink<W> {
    fn emit(&mut self, frame: &Frame) -> WorkerResult<()> {
        let bytes = self.conform(frame);
        self.writer.write_all(&bytes)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> WorkerResult<()> {
        self.writer.flush()?;
        debug!(frames = self.written, "Output finished");
        Ok(())
    }
}

/// Open the configured input.
pub fn open_source(
    endpoint: &StreamEndpoint,
    width: u32,
    height: u32,
    layout: PixelFormat,
) -> WorkerResult<Box<dyn FrameSource>> {
    let reader: Box<dyn Read + Send> = match endpoint {
        StreamEndpoint::Stdio => Box::new(BufReader::new(io::stdin())),
        StreamEndpoint::File(path) => {
            let file = File::open(path).map_err(|source| WorkerError::Open {
                what: "input",
                path: path.display().to_string(),
                source,
            })?;
            Box::new(BufReader::new(file))
        }
    };
    Ok(Box::new(RawVideoSource::new(reader, width, height, layout)))
}

/// Open the configured output.
pub fn open_sink(endpoint: &StreamEndpoint, geometry: OutputGeometry) -> WorkerResult<Box<dyn FrameSink>> {
    let writer: Box<dyn Write + Send> = match endpoint {
        StreamEndpoint::Stdio => Box::new(BufWriter::new(io::stdout())),
        StreamEndpoint::File(path) => {
            let file = File::create(path).map_err(|source| WorkerError::Open {
                what: "output",
                path: path.display().to_string(),
                source,
            })?;
            Box::new(BufWriter::new(file))
        }
    };
    Ok(Box::new(RawVideoSink::new(writer, geometry)))
}
