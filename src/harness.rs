//! Core benchmark execution logic.

use std::path::Path;
use std::time::Instant;

use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::backend::{BenchmarkPair, resolve_pairs};
use crate::config::{BenchConfig, FailurePolicy};
use crate::convert::load_network;
use crate::devices::{DeviceEnumerator, print_devices};
use crate::errors::{BenchError, BenchResult};
use crate::report::{Measurement, RunSummary, TrialOutcome, report_failure};
use crate::runtime::{InferenceRuntime, ModelConverter, Network};
use crate::tensor::{InputShape, InputTensor};

/// Discarded forward passes before the timed one.
pub const WARMUP_PASSES: usize = 5;

/// Drives one benchmark trial per admitted device/backend pair.
pub struct BenchmarkHarness<'a, D: ?Sized, R: ?Sized, C: ?Sized> {
    devices: &'a D,
    runtime: &'a R,
    converter: &'a C,
    config: BenchConfig,
}

impl<'a, D, R, C> BenchmarkHarness<'a, D, R, C>
where
    D: DeviceEnumerator + ?Sized,
    R: InferenceRuntime + ?Sized,
    C: ModelConverter + ?Sized,
{
    pub fn new(devices: &'a D, runtime: &'a R, converter: &'a C, config: BenchConfig) -> Self {
        Self {
            devices,
            runtime,
            converter,
            config,
        }
    }

    /// Benchmarks `model_path` on every admitted pair.
    ///
    /// Only a failing device query is returned as an error; trial failures
    /// are recorded in the summary.
    pub fn run(&self, model_path: &Path, shape: InputShape) -> BenchResult<RunSummary> {
        let devices = self.devices.list_devices()?;
        print_devices(&devices);

        let mut summary = RunSummary::default();
        if devices.is_empty() {
            return Ok(summary);
        }

        let pairs = resolve_pairs(
            &devices,
            &self.config.backends,
            self.config.warn_on_skipped_pairs,
        );
        info!(
            "Benchmarking {} on {} combination(s), input {:?}",
            model_path.display(),
            pairs.len(),
            shape.dims()
        );

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        for pair in pairs {
            println!("Trying {}", pair);

            let result = self.run_trial(&pair, model_path, shape, &mut rng);
            match &result {
                Ok(measurement) => measurement.print(),
                Err(e) => report_failure(&pair, e),
            }

            let failed = result.is_err();
            summary.outcomes.push(TrialOutcome { pair, result });

            if failed && self.config.failure_policy == FailurePolicy::Halt {
                warn!("Stopping after the first failed trial");
                break;
            }
        }

        Ok(summary)
    }

    /// The network lives only for the duration of this call.
    fn run_trial(
        &self,
        pair: &BenchmarkPair,
        model_path: &Path,
        shape: InputShape,
        rng: &mut StdRng,
    ) -> BenchResult<Measurement> {
        let mut network = load_network(self.runtime, self.converter, model_path, pair.backend)?;
        network.set_preferable_backend(pair.backend);
        network.set_preferable_target(pair.target)?;
        check_topology(&network)?;

        let input = InputTensor::random(shape, rng);
        measure(&mut network, &input)
    }
}

/// Rejects networks that do not have exactly one input and one output.
pub fn check_topology<N: Network + ?Sized>(network: &N) -> BenchResult<()> {
    let (inputs, outputs) = (network.input_count(), network.output_count());
    if inputs != 1 || outputs != 1 {
        return Err(BenchError::UnsupportedTopology { inputs, outputs });
    }
    Ok(())
}

/// Runs [`WARMUP_PASSES`] discarded passes, then times a single one.
pub fn measure<N: Network + ?Sized>(network: &mut N, input: &InputTensor) -> BenchResult<Measurement> {
    for _ in 0..WARMUP_PASSES {
        network.set_input(input)?;
        network.forward()?;
    }

    network.set_input(input)?;
    let start = Instant::now();
    let output_shape = network.forward()?;
    let elapsed = start.elapsed();

    Ok(Measurement {
        elapsed,
        output_shape,
    })
}
