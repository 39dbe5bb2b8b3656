//! Benchmark results and their console rendering.

use std::time::Duration;

use log::error;

use crate::backend::BenchmarkPair;
use crate::errors::{BenchError, BenchResult, error_chain};

/// Timing and output of one timed forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub output_shape: Vec<usize>,
}

impl Measurement {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Frames per second for a single frame, `None` when the pass finished
    /// below timer resolution.
    pub fn frames_per_second(&self) -> Option<f64> {
        if self.elapsed.is_zero() {
            None
        } else {
            Some(1.0 / self.elapsed.as_secs_f64())
        }
    }

    pub fn print(&self) {
        let fps = match self.frames_per_second() {
            Some(fps) => format!("{:.2}", fps),
            None => "unbounded".to_string(),
        };
        println!("Time taken: {:.3} ms, FPS: {}", self.elapsed_ms(), fps);
        println!("Output shape: {:?}", self.output_shape);
    }
}

/// Result of benchmarking one device/backend pair.
#[derive(Debug)]
pub struct TrialOutcome {
    pub pair: BenchmarkPair,
    pub result: BenchResult<Measurement>,
}

impl TrialOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a run, in the order the pairs were attempted.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<TrialOutcome>,
}

impl RunSummary {
    pub fn trials(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TrialOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Process exit status: 0 when every attempted trial succeeded.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Logs a failed trial with its full cause chain.
pub fn report_failure(pair: &BenchmarkPair, failure: &BenchError) {
    let chain = error_chain(failure);
    error!("An error occurred while trying {}: {}", pair, chain[0]);
    for cause in &chain[1..] {
        error!("  Caused by: {}", cause);
    }
    error!("  Debug: {:?}", failure);
}
