//! Error types for model loading, binding and execution.

use std::path::PathBuf;

use thiserror::Error;

use super::DeviceError;
use crate::backend::Target;

/// Errors that can occur while preparing or running a single benchmark trial,
/// or while setting the harness up.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("Failed to convert '{}' to the intermediate representation: {message}", path.display())]
    Conversion { path: PathBuf, message: String },

    #[error("Failed to load network from '{}': {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Failed to bind network to target {target}: {message}")]
    Bind { target: Target, message: String },

    #[error("Network has no backend and target selected")]
    NotBound,

    #[error("Network input has not been set")]
    MissingInput,

    #[error("Forward pass failed: {message}")]
    Execution { message: String },

    #[error(
        "Unsupported network topology: expected exactly 1 input and 1 output, got {inputs} inputs and {outputs} outputs"
    )]
    UnsupportedTopology { inputs: usize, outputs: usize },

    #[error(
        "Invalid input shape: channels={channels}, height={height}, width={width}. All dimensions must be greater than 0"
    )]
    InvalidInputShape {
        channels: usize,
        height: usize,
        width: usize,
    },

    #[error("Failed to parse configuration file '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Device enumeration failed")]
    Devices(#[source] DeviceError),
}

impl From<DeviceError> for BenchError {
    fn from(error: DeviceError) -> Self {
        BenchError::Devices(error)
    }
}
