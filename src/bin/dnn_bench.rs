//! Main benchmark CLI executable.

use clap::Parser;
use dnn_bench::cli::Cli;
use dnn_bench::devices::HostDevices;
use dnn_bench::errors::error_chain;
use dnn_bench::runtime::{NnefConverter, TractRuntime};
use dnn_bench::{BenchResult, BenchmarkHarness, ConfigLoader};
use log::error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let chain = error_chain(&e);
            error!("Benchmark execution failed: {}", chain[0]);
            for cause in &chain[1..] {
                error!("  Caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> BenchResult<i32> {
    let shape = cli.input_shape()?;
    let config = cli.apply(ConfigLoader::load(cli.config.as_deref())?);

    let devices = HostDevices::new();
    let runtime = TractRuntime::new();
    let converter = NnefConverter::new();
    let harness = BenchmarkHarness::new(&devices, &runtime, &converter, config);

    let summary = harness.run(&cli.model_path, shape)?;
    Ok(summary.exit_code())
}
