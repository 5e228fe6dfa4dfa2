//! Prometheus metrics for the reframing engine.
//!
//! Recording is a no-op until a recorder is installed (the worker installs
//! the Prometheus exporter when `METRICS_PORT` is set).

use metrics::{counter, gauge, histogram};

/// Metric name constants for consistency.
pub mod names {
    // Frame flow
    pub const FRAMES_INGESTED_TOTAL: &str = "reframe_frames_ingested_total";
    pub const FRAMES_EMITTED_TOTAL: &str = "reframe_frames_emitted_total";
    pub const BUFFER_DEPTH: &str = "reframe_buffer_depth";
    pub const FORCED_DRAINS_TOTAL: &str = "reframe_forced_drains_total";

    // Analysis
    pub const SCENE_CUTS_TOTAL: &str = "reframe_scene_cuts_total";
    pub const DETECTIONS_TOTAL: &str = "reframe_detections_total";
    pub const DETECTION_DURATION_SECONDS: &str = "reframe_detection_duration_seconds";

    // Output
    pub const FILTER_FAILURES_TOTAL: &str = "reframe_filter_failures_total";
    pub const STAGE_DURATION_SECONDS: &str = "reframe_stage_duration_seconds";

    // Control
    pub const OVERRIDE_COMMANDS_TOTAL: &str = "reframe_override_commands_total";
}

pub fn record_frame_ingested() {
    counter!(names::FRAMES_INGESTED_TOTAL).increment(1);
}

pub fn record_frames_emitted(count: usize) {
    counter!(names::FRAMES_EMITTED_TOTAL).increment(count as u64);
}

pub fn set_buffer_depth(depth: usize) {
    gauge!(names::BUFFER_DEPTH).set(depth as f64);
}

pub fn record_forced_drain() {
    counter!(names::FORCED_DRAINS_TOTAL).increment(1);
}

pub fn record_scene_cut() {
    counter!(names::SCENE_CUTS_TOTAL).increment(1);
}

/// Record one detection request and its latency.
pub fn record_detection(success: bool, duration_secs: f64) {
    let status = if success { "ok" } else { "failed" };
    counter!(names::DETECTIONS_TOTAL, "status" => status).increment(1);
    histogram!(names::DETECTION_DURATION_SECONDS).record(duration_secs);
}

pub fn record_filter_failure() {
    counter!(names::FILTER_FAILURES_TOTAL).increment(1);
}

pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

pub fn record_override_command(parameter: &'static str) {
    counter!(names::OVERRIDE_COMMANDS_TOTAL, "parameter" => parameter).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_frame_ingested();
        record_frames_emitted(3);
        set_buffer_depth(6);
        record_detection(false, 0.02);
        record_stage_duration("crop", 0.004);
    }

    #[test]
    fn test_names_are_prefixed() {
        for name in [
            names::FRAMES_INGESTED_TOTAL,
            names::FRAMES_EMITTED_TOTAL,
            names::BUFFER_DEPTH,
            names::SCENE_CUTS_TOTAL,
            names::OVERRIDE_COMMANDS_TOTAL,
        ] {
            assert!(name.starts_with("reframe_"));
        }
    }
}
