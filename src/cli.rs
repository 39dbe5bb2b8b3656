//! Command-line surface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{BenchConfig, FailurePolicy};
use crate::errors::BenchResult;
use crate::tensor::InputShape;

/// Benchmark a model on every compatible device/backend combination.
#[derive(Parser, Debug)]
#[command(name = "dnn_bench")]
#[command(about = "Benchmark a neural-network model across inference backends and devices")]
#[command(version)]
pub struct Cli {
    /// Path to the ONNX model file
    #[arg(long, alias = "model_path")]
    pub model_path: PathBuf,

    /// Network input width
    #[arg(long, alias = "input_width", default_value_t = 640)]
    pub input_width: usize,

    /// Network input height
    #[arg(long, alias = "input_height", default_value_t = 640)]
    pub input_height: usize,

    /// Network input channels
    #[arg(long, alias = "input_channels", default_value_t = 3)]
    pub input_channels: usize,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Backend to try; repeat to try several. Overrides the configuration
    #[arg(long = "backend", value_name = "ID")]
    pub backends: Vec<String>,

    /// Keep benchmarking the remaining combinations after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Seed for the random input
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    pub fn input_shape(&self) -> BenchResult<InputShape> {
        InputShape::new(self.input_channels, self.input_height, self.input_width)
    }

    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply(&self, mut config: BenchConfig) -> BenchConfig {
        if !self.backends.is_empty() {
            config.backends = self.backends.clone();
        }
        if self.keep_going {
            config.failure_policy = FailurePolicy::Continue;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }
}
