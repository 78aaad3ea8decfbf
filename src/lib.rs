//! Netgrab - bulk application-layer scanner core
//!
//! Expands target specifications, feeds them through a bounded
//! producer/worker/sink pipeline, runs an ordered probe sequence per
//! connection and streams one JSON record per target-run.

pub mod config;
pub mod connection;
pub mod error;
pub mod monitor;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod target;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use connection::TimedConnection;
pub use error::ScanError;
pub use monitor::Monitor;
pub use output::{Grab, ProbeResult};
pub use pipeline::{Pipeline, PipelineSummary};
pub use probe::{Probe, ProbeSequence};
pub use target::ScanTarget;

pub type Result<T> = std::result::Result<T, ScanError>;
