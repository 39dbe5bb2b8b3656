//! Seams to the inference library.
//!
//! The harness only ever talks to these traits. [`tract`] provides the
//! production implementations; tests substitute fakes.

pub mod tract;

use std::path::PathBuf;

use crate::backend::{Backend, Target};
use crate::convert::IrArtifacts;
use crate::errors::BenchResult;
use crate::tensor::InputTensor;

pub use self::tract::{NnefConverter, TractNetwork, TractRuntime};

/// Where a network is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// The original model file, read directly.
    File(PathBuf),
    /// A converted structure/weights pair.
    Ir(IrArtifacts),
}

/// Loads networks from model files.
pub trait InferenceRuntime {
    type Network: Network;

    /// Reads a network. The result has no backend or target selected yet.
    fn read_network(&self, source: &ModelSource) -> BenchResult<Self::Network>;
}

/// A loaded, bindable network.
pub trait Network {
    /// Number of graph inputs.
    fn input_count(&self) -> usize;

    /// Number of graph outputs.
    fn output_count(&self) -> usize;

    fn set_preferable_backend(&mut self, backend: Backend);

    /// Binds the network to a target. Fails if the target cannot be served.
    fn set_preferable_target(&mut self, target: Target) -> BenchResult<()>;

    fn set_input(&mut self, input: &InputTensor) -> BenchResult<()>;

    /// Runs one synchronous forward pass and returns the output shape.
    fn forward(&mut self) -> BenchResult<Vec<usize>>;
}

/// Converts a model file into the intermediate representation.
pub trait ModelConverter {
    /// Writes both artifacts, overwriting existing files.
    fn convert(&self, model_path: &std::path::Path, artifacts: &IrArtifacts) -> BenchResult<()>;
}
