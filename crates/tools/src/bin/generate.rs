//! Dataset generator.
//!
//! Runs every scenario of an experiment and writes one series file per run.
//!
//! Usage: `generate <experiment.yaml> [--reactions PATH] [--output DIR] [--seed N] [--list] [--parallel]`

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use lagchem_dataset::{Experiment, plan, run_experiment};
use lagchem_runtime::load_reactions;

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Simulate an experiment's scenarios and write their time series")]
struct Args {
    /// Path to the experiment YAML file
    experiment: PathBuf,

    /// Override the reaction description file
    #[arg(long)]
    reactions: Option<PathBuf>,

    /// Override the output directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the base seed
    #[arg(long)]
    seed: Option<u64>,

    /// List the planned runs and exit without simulating
    #[arg(long)]
    list: bool,

    /// Run scenarios in parallel
    #[arg(long)]
    parallel: bool,
}

fn main() {
    lagchem_tools::init_logging();

    let args = Args::parse();

    let mut experiment = match Experiment::load(&args.experiment) {
        Ok(e) => {
            info!(
                "Loaded experiment: {} ({})",
                e.metadata.name,
                args.experiment.display()
            );
            e
        }
        Err(e) => {
            error!(
                "Failed to load experiment '{}': {}",
                args.experiment.display(),
                e
            );
            process::exit(1);
        }
    };

    if let Some(seed) = args.seed {
        experiment.seed = seed;
    }
    if let Some(output) = args.output {
        experiment.output.directory = output;
    }
    if args.parallel {
        experiment.parallel = true;
    }

    if args.list {
        let runs = match plan(&experiment) {
            Ok(runs) => runs,
            Err(e) => {
                error!("Failed to plan experiment: {}", e);
                process::exit(1);
            }
        };
        info!("{} planned runs:", runs.len());
        for run in runs {
            let active: Vec<&str> = run.active.iter().map(|s| s.as_str()).collect();
            info!(
                "  {} seed={} active=[{}]",
                run.path.display(),
                run.seed,
                active.join(", ")
            );
        }
        return;
    }

    let Some(reactions_path) = args.reactions.or_else(|| experiment.reactions_path()) else {
        error!("No reaction description: set `reactions` in the experiment or pass --reactions");
        process::exit(1);
    };
    let catalog = match load_reactions(&reactions_path) {
        Ok(c) => c,
        Err(e) => {
            error!(
                "Failed to load reactions '{}': {}",
                reactions_path.display(),
                e
            );
            process::exit(1);
        }
    };
    info!(
        "Loaded {} reactions over {} species from {}",
        catalog.len(),
        catalog.species().len(),
        reactions_path.display()
    );

    let factory = experiment.container_factory();
    let report = match run_experiment(&experiment, Arc::new(catalog), &factory) {
        Ok(r) => r,
        Err(e) => {
            error!("Experiment failed: {}", e);
            process::exit(1);
        }
    };

    for skipped in &report.skipped {
        warn!(
            "Run {} ({}) skipped: {}",
            skipped.index,
            skipped.path.display(),
            skipped.reason
        );
    }
    info!(
        "Wrote {} of {} datasets to {}",
        report.written.len(),
        report.total(),
        experiment.output.directory.display()
    );

    if report.written.is_empty() && report.total() > 0 {
        process::exit(1);
    }
}
