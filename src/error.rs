//! Error types for state persistence and hook execution.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the filesystem state store.
///
/// These never escape a hook invocation: callers log them and fall back to
/// the conservative default (absent state, zero count, allow).
#[derive(Error, Debug)]
pub enum StateError {
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level errors for configuration loading and hook entry points.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("State error: {0}")]
    StateError(#[from] StateError),
}
