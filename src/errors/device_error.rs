//! Error types for compute device discovery.

use thiserror::Error;

/// Errors raised while querying the host for compute devices.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device query failed: {message}")]
    QueryFailed { message: String },
}
