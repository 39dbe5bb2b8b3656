//! Error types for the benchmark harness.
//!
//! Every failure is a concrete `thiserror` enum rather than a generic wrapper
//! like `anyhow` or `Box<dyn Error>`. Errors raised by the inference library
//! are rendered into the `message` fields with their full context chain.

mod bench_error;
mod device_error;

pub use bench_error::BenchError;
pub use device_error::DeviceError;

/// Result type alias for loading, binding and running a benchmark.
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Result type alias for device enumeration.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Renders an error followed by every `source()` below it, outermost first.
pub fn error_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}
