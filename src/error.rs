//! Error handling for the netgrab pipeline
//!
//! Per-target and per-probe failures are contained and reported as data
//! inside the probe's result; only structural failures (encoding, sink
//! writes) escalate past the worker.

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("connection failed: {0}")]
    Dial(String),

    #[error("i/o timeout")]
    IoTimeout,

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("output write failed: {0}")]
    Output(String),
}

