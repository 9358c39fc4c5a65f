//! Error taxonomy for the metrics pipeline and its collaborators.

use std::time::Duration;

use thiserror::Error;

/// A collector call failed. Always recoverable: the pump logs it and keeps
/// the previous `latest` snapshot.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection failed: {0}")]
    Failed(String),

    #[error("collection timed out after {0:?}")]
    Timeout(Duration),

    #[error("previous collection is still in flight")]
    Busy,

    #[error("collector panicked: {0}")]
    Panicked(String),
}

/// Store invariants were found broken. Unreachable in a correct build.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("no tokio runtime available to schedule the collection task")]
    NoRuntime,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
