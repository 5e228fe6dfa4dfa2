//! Detection worker.
//!
//! Models run on their own OS thread so inference never blocks the async
//! pipeline. The pipeline talks to it through a [`DetectionHandle`]: one
//! request, one reply, and never more than one request in flight.

use image::RgbImage;
use reframe_models::DetectionOutput;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::providers::SubjectDetector;
use crate::core::metrics;
use crate::error::{MediaError, MediaResult};

struct DetectionRequest {
    image: RgbImage,
    reply: oneshot::Sender<MediaResult<DetectionOutput>>,
}

/// Handle to a running detection worker.
///
/// `analyse` takes `&mut self`, so a handle can only have one request
/// outstanding at a time.
pub struct DetectionHandle {
    tx: Option<mpsc::Sender<DetectionRequest>>,
    thread: Option<JoinHandle<()>>,
    name: &'static str,
}

impl DetectionHandle {
    /// Spawn the worker thread and initialize the detector on it.
    ///
    /// Resolves once initialization finished. An initialization failure is
    /// returned as [`MediaError::DetectorInit`] and the thread exits.
    pub async fn start(mut detector: Box<dyn SubjectDetector>) -> MediaResult<Self> {
        let name = detector.name();
        let (tx, mut rx) = mpsc::channel::<DetectionRequest>(1);
        let (ready_tx, ready_rx) = oneshot::channel::<MediaResult<()>>();

        let thread = thread::Builder::new()
            .name("reframe-detect".to_string())
            .spawn(move || {
                let started = Instant::now();
                if let Err(e) = detector.initialize() {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                info!(
                    detector = detector.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Detection models loaded"
                );
                let _ = ready_tx.send(Ok(()));

                while let Some(request) = rx.blocking_recv() {
                    let result = detector.detect(&request.image);
                    // The requester may have gone away during shutdown.
                    let _ = request.reply.send(result);
                }
                debug!("Detection worker exiting");
            })?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                thread: Some(thread),
                name,
            }),
            // The thread returns right after reporting; it is left to finish
            // on its own rather than joined from async context.
            Ok(Err(e)) => {
                drop(thread);
                Err(MediaError::detector_init(e.to_string()))
            }
            Err(_) => {
                drop(thread);
                Err(MediaError::detector_init("detection thread exited during initialization"))
            }
        }
    }

    /// Detector name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run detection on one frame.
    pub async fn analyse(&mut self, image: RgbImage) -> MediaResult<DetectionOutput> {
        let tx = self.tx.as_ref().ok_or(MediaError::WorkerGone)?;
        let (reply, response) = oneshot::channel();
        let started = Instant::now();

        tx.send(DetectionRequest { image, reply })
            .await
            .map_err(|_| MediaError::WorkerGone)?;
        let result = response.await.map_err(|_| MediaError::WorkerGone)?;

        metrics::record_detection(result.is_ok(), started.elapsed().as_secs_f64());
        result
    }

    /// Stop the worker. Never blocks.
    ///
    /// Closing the request channel ends the worker loop. A thread that has
    /// already exited is reaped; one still busy with an inference is
    /// detached and exits when that inference returns.
    pub fn shutdown(&mut self) {
        self.tx.take();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if !thread.is_finished() {
            debug!(detector = self.name, "Detection worker busy, detaching");
            return;
        }
        if thread.join().is_err() {
            warn!("Detection worker panicked");
        }
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop; don't block in drop.
        self.tx.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reframe_models::{DetectionRegion, SubjectClass};
    use std::time::Duration;

    struct CountingDetector {
        calls: usize,
    }

    impl SubjectDetector for CountingDetector {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn initialize(&mut self) -> MediaResult<()> {
            Ok(())
        }
        fn detect(&mut self, image: &RgbImage) -> MediaResult<DetectionOutput> {
            self.calls += 1;
            if self.calls == 2 {
                return Err(MediaError::detection_failed("flaky model"));
            }
            let w = image.width() as f64;
            Ok(DetectionOutput::from_iter([DetectionRegion::new(
                (0.0, 0.0),
                (w, 1.0),
                0.9,
                SubjectClass::Person,
            )]))
        }
    }

    struct BrokenDetector;

    impl SubjectDetector for BrokenDetector {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn initialize(&mut self) -> MediaResult<()> {
            Err(MediaError::internal("weights missing"))
        }
        fn detect(&mut self, _image: &RgbImage) -> MediaResult<DetectionOutput> {
            unreachable!()
        }
    }

    struct SlowDetector;

    impl SubjectDetector for SlowDetector {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn initialize(&mut self) -> MediaResult<()> {
            Ok(())
        }
        fn detect(&mut self, _image: &RgbImage) -> MediaResult<DetectionOutput> {
            thread::sleep(Duration::from_secs(2));
            Ok(DetectionOutput::empty())
        }
    }

    #[tokio::test]
    async fn test_request_response() {
        let mut handle = DetectionHandle::start(Box::new(CountingDetector { calls: 0 }))
            .await
            .unwrap();
        assert_eq!(handle.name(), "counting");

        let first = handle.analyse(RgbImage::new(8, 2)).await.unwrap();
        assert_eq!(first.regions[0].x2(), 8.0);

        let second = handle.analyse(RgbImage::new(8, 2)).await;
        assert!(matches!(second, Err(MediaError::DetectionFailed(_))));

        let third = handle.analyse(RgbImage::new(4, 2)).await.unwrap();
        assert_eq!(third.len(), 1);

        handle.shutdown();
        assert!(matches!(
            handle.analyse(RgbImage::new(4, 2)).await,
            Err(MediaError::WorkerGone)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_does_not_wait_for_inference() {
        let mut handle = DetectionHandle::start(Box::new(SlowDetector)).await.unwrap();

        // Leave a request running on the worker thread.
        let pending =
            tokio::time::timeout(Duration::from_millis(50), handle.analyse(RgbImage::new(4, 4))).await;
        assert!(pending.is_err());

        let started = Instant::now();
        handle.shutdown();
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "shutdown blocked for {:?}",
            started.elapsed()
        );
        assert!(matches!(
            handle.analyse(RgbImage::new(4, 4)).await,
            Err(MediaError::WorkerGone)
        ));
    }

    #[test]
    fn test_init_failure_is_fatal() {
        let err = tokio_test::block_on(DetectionHandle::start(Box::new(BrokenDetector)))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::DetectorInit(_)));
        assert!(err.is_fatal());
    }
}
