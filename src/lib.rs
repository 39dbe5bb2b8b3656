//! Benchmark a neural-network model across inference backends and devices.
//!
//! The host's compute devices are crossed with the configured backends, each
//! admitted combination loads the model, runs warmup passes on random input,
//! then times a single forward pass and reports latency, throughput and the
//! output shape.

pub mod backend;
pub mod cli;
pub mod config;
pub mod convert;
pub mod devices;
pub mod errors;
pub mod harness;
pub mod report;
pub mod runtime;
pub mod tensor;

pub use backend::{Backend, BenchmarkPair, DeviceKind, Target};
pub use config::{BenchConfig, ConfigLoader, FailurePolicy};
pub use errors::{BenchError, BenchResult, DeviceError};
pub use harness::{BenchmarkHarness, WARMUP_PASSES};
pub use report::{Measurement, RunSummary, TrialOutcome};
pub use tensor::{InputShape, InputTensor};
