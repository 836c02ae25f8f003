use std::process::ExitCode;

use setbench::probe::{MemoryProbe, TrackingAllocator};
use setbench::{ExperimentConfig, ExperimentDriver};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOC: TrackingAllocator = TrackingAllocator;

fn main() -> ExitCode {
    // The report goes to stdout, so logs stay on stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("setbench=info")),
        )
        .init();

    let config = ExperimentConfig::from_env();
    info!(
        universe = config.universe,
        repetitions = config.repetitions,
        seed = config.seed,
        thresholds = ?config.thresholds,
        "starting"
    );

    let probe = if config.probe {
        match MemoryProbe::init() {
            Ok(probe) => Some(probe),
            Err(e) => {
                warn!("{e}; true footprint columns omitted");
                None
            }
        }
    } else {
        None
    };

    let driver = match ExperimentDriver::new(config, probe) {
        Ok(driver) => driver,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    match driver.run(&mut stdout.lock()) {
        Ok(reports) => {
            info!(sections = reports.len(), "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
