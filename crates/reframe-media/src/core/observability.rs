//! Timing telemetry for the live pipeline.
//!
//! Stages record how long they took into named buckets. Every report
//! interval the rolling average of each bucket is logged and the buckets are
//! reset, so the log shows the recent cost of each stage rather than a
//! lifetime mean.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::info;

use super::metrics;

/// Default interval between timing reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    total: Duration,
    count: u32,
}

/// Named timing buckets with a periodic average report.
#[derive(Debug)]
pub struct TimingTelemetry {
    buckets: BTreeMap<&'static str, Bucket>,
    interval: Duration,
    window_start: Instant,
}

impl TimingTelemetry {
    pub fn new(interval: Duration) -> Self {
        Self {
            buckets: BTreeMap::new(),
            interval,
            window_start: Instant::now(),
        }
    }

    /// Add one sample to `bucket`.
    pub fn record(&mut self, bucket: &'static str, elapsed: Duration) {
        let entry = self.buckets.entry(bucket).or_default();
        entry.total += elapsed;
        entry.count += 1;
        metrics::record_stage_duration(bucket, elapsed.as_secs_f64());
    }

    /// Start timing a bucket. Call [`StageTimer::finish`] to record it.
    pub fn start(&self, bucket: &'static str) -> StageTimer {
        StageTimer {
            bucket,
            start: Instant::now(),
        }
    }

    /// Average per bucket over the current window.
    pub fn averages(&self) -> Vec<(&'static str, Duration)> {
        self.buckets
            .iter()
            .filter(|(_, b)| b.count > 0)
            .map(|(name, b)| (*name, b.total / b.count))
            .collect()
    }

    /// Log and reset the buckets if the interval has elapsed.
    ///
    /// Returns the reported averages.
    pub fn maybe_report(&mut self, now: Instant) -> Option<Vec<(&'static str, Duration)>> {
        if now.duration_since(self.window_start) < self.interval {
            return None;
        }
        let averages = self.averages();
        for (bucket, avg) in &averages {
            info!(
                bucket = *bucket,
                avg_ms = format!("{:.2}", avg.as_secs_f64() * 1000.0),
                "Stage timing"
            );
        }
        self.buckets.clear();
        self.window_start = now;
        Some(averages)
    }
}

impl Default for TimingTelemetry {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL)
    }
}

/// Timer for one stage invocation.
#[derive(Debug)]
pub struct StageTimer {
    bucket: &'static str,
    start: Instant,
}

impl StageTimer {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record the elapsed time into `telemetry`.
    pub fn finish(self, telemetry: &mut TimingTelemetry) {
        telemetry.record(self.bucket, self.start.elapsed());
    }
}

/// Average inter-frame time, reported every `every` frames.
#[derive(Debug)]
pub struct FrameRateMonitor {
    every: u64,
    count: u64,
    window_start: Instant,
}

impl FrameRateMonitor {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Count one frame. Returns the average frame time when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        self.count += 1;
        if self.count < self.every {
            return None;
        }
        let avg = now.duration_since(self.window_start) / self.count as u32;
        self.count = 0;
        self.window_start = now;
        Some(avg)
    }
}
