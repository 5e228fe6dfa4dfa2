//! Live reframing worker.
//!
//! This crate provides:
//! - Raw video capture and output over pipes or files
//! - The capture, pipeline and sink stages with bounded backpressure
//! - OSC override control over UDP
//! - A JSON-lines crop decision log
//! - Graceful shutdown

pub mod config;
pub mod control;
pub mod decision_log;
pub mod error;
pub mod executor;
pub mod io;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{ReframeExecutor, RunSummary};
