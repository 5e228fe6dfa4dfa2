//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use reframe_media::{PixelFormat, ReframeConfig};
use reframe_models::AspectRatio;

use crate::error::{WorkerError, WorkerResult};

/// Where frames come from or go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEndpoint {
    /// stdin for input, stdout for output.
    Stdio,
    File(PathBuf),
}

impl StreamEndpoint {
    fn parse(value: &str) -> Self {
        if value == "-" || value.is_empty() {
            StreamEndpoint::Stdio
        } else {
            StreamEndpoint::File(PathBuf::from(value))
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Engine tunables
    pub reframe: ReframeConfig,
    /// Raw video input
    pub input: StreamEndpoint,
    /// Layout of the raw input frames
    pub input_format: PixelFormat,
    /// Raw BGRA output
    pub output: StreamEndpoint,
    /// OSC override listener address; `None` disables it
    pub osc_addr: Option<SocketAddr>,
    /// Prometheus exporter port; `None` disables it
    pub metrics_port: Option<u16>,
    /// JSON-lines decision log
    pub decision_log: Option<PathBuf>,
    /// Log the input frame interval every N frames
    pub input_rate_frames: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reframe: ReframeConfig::default(),
            input: StreamEndpoint::Stdio,
            input_format: PixelFormat::Uyvy422,
            output: StreamEndpoint::Stdio,
            osc_addr: Some(SocketAddr::from(([0, 0, 0, 0], 10024))),
            metrics_port: None,
            decision_log: None,
            input_rate_frames: 250,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let mut reframe = match std::env::var("REFRAME_PRESET").ok().as_deref() {
            None | Some("") | Some("broadcast") => ReframeConfig::broadcast(),
            Some("portrait") => ReframeConfig::portrait(),
            Some("responsive") => ReframeConfig::responsive(),
            Some("smooth") => ReframeConfig::smooth(),
            Some(other) => {
                return Err(WorkerError::config_error(format!("unknown preset '{}'", other)))
            }
        };

        reframe.source_width = env_parse("REFRAME_SOURCE_WIDTH").unwrap_or(reframe.source_width);
        reframe.source_height = env_parse("REFRAME_SOURCE_HEIGHT").unwrap_or(reframe.source_height);
        if let Ok(aspect) = std::env::var("REFRAME_ASPECT") {
            reframe.aspect = AspectRatio::from_str(&aspect)
                .map_err(|e| WorkerError::config_error(e.to_string()))?;
        }
        reframe.output_width = env_parse("REFRAME_OUTPUT_WIDTH").unwrap_or(reframe.output_width);
        reframe.output_height = env_parse("REFRAME_OUTPUT_HEIGHT").unwrap_or(reframe.output_height);
        reframe.lookback_frames =
            env_parse("REFRAME_LOOKBACK_FRAMES").unwrap_or(reframe.lookback_frames);
        reframe.detection_cadence =
            env_parse("REFRAME_DETECTION_CADENCE").unwrap_or(reframe.detection_cadence);
        reframe.scene_threshold =
            env_parse("REFRAME_SCENE_THRESHOLD").unwrap_or(reframe.scene_threshold);
        reframe.max_accel = env_parse("REFRAME_MAX_ACCEL").unwrap_or(reframe.max_accel);
        reframe.max_decel = env_parse("REFRAME_MAX_DECEL").unwrap_or(reframe.max_decel);
        reframe.widen_margin = env_parse("REFRAME_WIDEN_MARGIN").unwrap_or(reframe.widen_margin);
        reframe.trailing_bias = env_parse("REFRAME_TRAILING_BIAS").unwrap_or(reframe.trailing_bias);

        reframe.validate()?;

        let input_format = match std::env::var("REFRAME_INPUT_FORMAT") {
            Ok(s) => s.parse::<PixelFormat>()?,
            Err(_) => PixelFormat::Uyvy422,
        };

        let osc_port: u16 = env_parse("REFRAME_OSC_PORT").unwrap_or(10024);
        let osc_addr = if osc_port == 0 {
            None
        } else {
            let host: std::net::IpAddr =
                env_parse("REFRAME_OSC_HOST").unwrap_or_else(|| [0, 0, 0, 0].into());
            Some(SocketAddr::new(host, osc_port))
        };

        Ok(Self {
            reframe,
            input: StreamEndpoint::parse(&std::env::var("REFRAME_INPUT").unwrap_or_default()),
            input_format,
            output: StreamEndpoint::parse(&std::env::var("REFRAME_OUTPUT").unwrap_or_default()),
            osc_addr,
            metrics_port: env_parse("METRICS_PORT"),
            decision_log: std::env::var("REFRAME_DECISION_LOG")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            input_rate_frames: env_parse("REFRAME_INPUT_RATE_FRAMES").unwrap_or(250),
        })
    }

    /// Capacity of the capture to pipeline channel.
    pub fn capture_queue(&self) -> usize {
        (self.reframe.detection_cadence as usize * 2).max(1)
    }

    /// Capacity of the pipeline to sink channel.
    pub fn output_queue(&self) -> usize {
        self.reframe.forced_drain_depth().max(1)
    }
}
