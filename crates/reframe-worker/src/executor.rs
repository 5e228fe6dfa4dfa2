//! Stream executor.
//!
//! Three stages joined by bounded channels:
//!
//! ```text
//! capture (blocking) --frames--> pipeline (async) --reframed--> sink (blocking)
//!                                      ^
//!                       OSC listener --+ override commands
//! ```
//!
//! The capture stage blocks when the pipeline falls behind, and the
//! pipeline sees how much room the sink channel has left, which is what the
//! lookback buffer drains against.

use std::sync::Arc;
use std::time::Instant;

use reframe_media::{
    FormatAdapter, Frame, FrameRateMonitor, ReframedFrame, Reframer, SoftwareCropFilter,
    SubjectDetector,
};
use reframe_models::OverrideCommand;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::control::OscListener;
use crate::decision_log::DecisionLog;
use crate::error::{WorkerError, WorkerResult};
use crate::io::{self, FrameSink, FrameSource};

const COMMAND_QUEUE: usize = 64;

/// Frame counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_in: u64,
    pub frames_out: u64,
}

/// Runs one stream from input to output.
pub struct ReframeExecutor {
    config: WorkerConfig,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ReframeExecutor {
    pub fn new(config: WorkerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Signal shutdown. Capture stops, buffered frames are flushed.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Handle that can signal shutdown from another task.
    pub fn shutdown_handle(&self) -> Arc<watch::Sender<bool>> {
        Arc::clone(&self.shutdown)
    }

    /// Run against the configured input and output.
    pub async fn run(&self, detector: Box<dyn SubjectDetector>) -> WorkerResult<RunSummary> {
        let reframe = &self.config.reframe;
        let source = io::open_source(
            &self.config.input,
            reframe.source_width,
            reframe.source_height,
            self.config.input_format,
        )?;
        let sink = io::open_sink(&self.config.output, reframe.output_geometry())?;
        self.run_with(source, sink, detector).await
    }

    /// Run against an explicit source and sink.
    pub async fn run_with(
        &self,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        detector: Box<dyn SubjectDetector>,
    ) -> WorkerResult<RunSummary> {
        let started = Instant::now();
        let mut reframer = Reframer::start(
            self.config.reframe.clone(),
            detector,
            Box::new(SoftwareCropFilter::new()),
        )
        .await?;

        let decision_log = match &self.config.decision_log {
            Some(path) => Some(DecisionLog::create(path)?),
            None => None,
        };

        let (frame_tx, mut frame_rx) = mpsc::channel(self.config.capture_queue());
        let (out_tx, out_rx) = mpsc::channel(self.config.output_queue());
        let (cmd_tx, mut cmd_rx) = mpsc::channel(COMMAND_QUEUE);

        let capture = self.spawn_capture(source, frame_tx);
        let sink_task = spawn_sink(sink, decision_log, out_rx);
        let control = self.spawn_control(cmd_tx).await?;

        let pipeline = self
            .drive(&mut reframer, &mut frame_rx, &mut cmd_rx, &out_tx)
            .await;
        reframer.shutdown();
        drop(out_tx);
        drop(frame_rx);

        // Stop the control listener whatever the outcome.
        let interrupted = *self.shutdown.borrow();
        let _ = self.shutdown.send(true);
        if let Some(control) = control {
            if let Ok(Err(e)) = control.await {
                warn!(error = %e, "OSC listener failed");
            }
        }

        let sink_result = sink_task
            .await
            .map_err(|_| WorkerError::StageStopped("sink"))
            .and_then(|r| r);

        let frames_out = match (pipeline, sink_result) {
            (Ok(_), Ok(written)) => written,
            (_, Err(e)) | (Err(e), Ok(_)) => return Err(e),
        };

        // A capture blocked on a read that will never complete must not hold
        // up an interrupted run.
        let frames_in = if interrupted {
            capture.abort();
            0
        } else {
            capture
                .await
                .map_err(|_| WorkerError::StageStopped("capture"))??
        };

        info!(
            frames_in,
            frames_out,
            elapsed_ms = started.elapsed().as_millis() as u64,
            interrupted,
            "Stream finished"
        );
        Ok(RunSummary { frames_in, frames_out })
    }

    async fn drive(
        &self,
        reframer: &mut Reframer,
        frames: &mut mpsc::Receiver<Frame>,
        commands: &mut mpsc::Receiver<OverrideCommand>,
        out: &mpsc::Sender<ReframedFrame>,
    ) -> WorkerResult<()> {
        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            let frame = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received, flushing");
                        break;
                    }
                    continue;
                }
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            while let Ok(command) = commands.try_recv() {
                reframer.apply_override(command);
            }

            for reframed in reframer.push(frame, out.capacity()).await? {
                send(out, reframed).await?;
            }
        }

        for reframed in reframer.flush() {
            send(out, reframed).await?;
        }
        Ok(())
    }

    fn spawn_capture(
        &self,
        mut source: Box<dyn FrameSource>,
        frames: mpsc::Sender<Frame>,
    ) -> JoinHandle<WorkerResult<u64>> {
        let reframe = &self.config.reframe;
        let adapter = FormatAdapter::new(
            reframe.source_width,
            reframe.source_height,
            self.config.input_format,
        );
        let mut monitor = FrameRateMonitor::new(self.config.input_rate_frames);
        let shutdown = self.shutdown.subscribe();

        tokio::task::spawn_blocking(move || -> WorkerResult<u64> {
            let mut count = 0u64;
            while !*shutdown.borrow() {
                let Some(capture) = source.next_frame()? else {
                    break;
                };
                let frame = adapter.adapt(&capture)?;
                count += 1;
                if let Some(avg) = monitor.tick(Instant::now()) {
                    info!(
                        frame_ms = format!("{:.2}", avg.as_secs_f64() * 1000.0),
                        frames = count,
                        "Input rate"
                    );
                }
                if frames.blocking_send(frame).is_err() {
                    debug!("Pipeline closed, capture stopping");
                    break;
                }
            }
            Ok(count)
        })
    }

    async fn spawn_control(
        &self,
        commands: mpsc::Sender<OverrideCommand>,
    ) -> WorkerResult<Option<JoinHandle<WorkerResult<()>>>> {
        let Some(addr) = self.config.osc_addr else {
            debug!("OSC control disabled");
            return Ok(None);
        };
        let listener = OscListener::bind(addr).await?;
        let shutdown = self.shutdown.subscribe();
        Ok(Some(tokio::spawn(listener.run(commands, shutdown))))
    }
}

async fn send(out: &mpsc::Sender<ReframedFrame>, frame: ReframedFrame) -> WorkerResult<()> {
    out.send(frame)
        .await
        .map_err(|_| WorkerError::StageStopped("sink"))
}

fn spawn_sink(
    mut sink: Box<dyn FrameSink>,
    mut decision_log: Option<DecisionLog<std::io::BufWriter<std::fs::File>>>,
    mut frames: mpsc::Receiver<ReframedFrame>,
) -> JoinHandle<WorkerResult<u64>> {
    tokio::task::spawn_blocking(move || -> WorkerResult<u64> {
        let mut written = 0u64;
        while let Some(reframed) = frames.blocking_recv() {
            if let Err(e) = sink.emit(&reframed.frame) {
                error!(pts = reframed.decision.pts, error = %e, "Output write failed");
                return Err(e);
            }
            if let Some(log) = decision_log.as_mut() {
                log.record(&reframed.decision)?;
            }
            written += 1;
        }
        sink.finish()?;
        if let Some(log) = decision_log.as_mut() {
            log.flush()?;
        }
        Ok(written)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use reframe_media::{CaptureFrame, NullDetector, PixelFormat, ReframeConfig};

    use crate::config::StreamEndpoint;

    struct SyntheticSource {
        remaining: u64,
        pts: i64,
    }

    impl FrameSource for SyntheticSource {
        fn next_frame(&mut self) -> WorkerResult<Option<CaptureFrame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let frame = Frame::solid(64, 36, self.pts, [50, 60, 70, 255]);
            self.pts += 1;
            Ok(Some(CaptureFrame::new(frame.data.to_vec(), 64, 36, PixelFormat::Bgra, frame.pts)))
        }
    }

    #[derive(Clone, Default)]
    struct CollectingSink(Arc<Mutex<Vec<(i64, u32, u32)>>>);

    impl FrameSink for CollectingSink {
        fn emit(&mut self, frame: &Frame) -> WorkerResult<()> {
            self.0.lock().unwrap().push((frame.pts, frame.width, frame.height));
            Ok(())
        }
    }

    fn config(dir: &std::path::Path) -> WorkerConfig {
        WorkerConfig {
            reframe: ReframeConfig {
                source_width: 64,
                source_height: 36,
                output_width: 18,
                output_height: 18,
                ..ReframeConfig::default()
            },
            input: StreamEndpoint::Stdio,
            input_format: PixelFormat::Bgra,
            output: StreamEndpoint::Stdio,
            osc_addr: None,
            metrics_port: None,
            decision_log: Some(dir.join("decisions.jsonl")),
            input_rate_frames: 10,
        }
    }

    #[tokio::test]
    async fn test_every_frame_reaches_the_sink_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let executor = ReframeExecutor::new(config(dir.path()));
        let sink = CollectingSink::default();

        let summary = executor
            .run_with(
                Box::new(SyntheticSource { remaining: 40, pts: 0 }),
                Box::new(sink.clone()),
                Box::new(NullDetector),
            )
            .await
            .unwrap();

        assert_eq!(summary, RunSummary { frames_in: 40, frames_out: 40 });
        let emitted = sink.0.lock().unwrap().clone();
        assert_eq!(
            emitted.iter().map(|(pts, _, _)| *pts).collect::<Vec<_>>(),
            (0..40).collect::<Vec<_>>()
        );
        assert!(emitted.iter().all(|(_, w, h)| (*w, *h) == (18, 18)));

        let log = std::fs::read_to_string(dir.path().join("decisions.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 40);
    }

    #[tokio::test]
    async fn test_truncated_input_fails_the_run() {
        struct Truncated;
        impl FrameSource for Truncated {
            fn next_frame(&mut self) -> WorkerResult<Option<CaptureFrame>> {
                Err(WorkerError::TruncatedFrame { got: 3, expected: 9216 })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let executor = ReframeExecutor::new(config(dir.path()));
        let result = executor
            .run_with(
                Box::new(Truncated),
                Box::new(CollectingSink::default()),
                Box::new(NullDetector),
            )
            .await;
        assert!(matches!(result, Err(WorkerError::TruncatedFrame { .. })));
    }
}
