//! Cross-cutting engine infrastructure: metrics and timing telemetry.

pub mod metrics;
pub mod observability;

pub use observability::{FrameRateMonitor, StageTimer, TimingTelemetry};
