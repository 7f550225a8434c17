//! Ground-truth graph writer.
//!
//! Derives the lag-1 → lag-0 causal graph of a reaction network.
//!
//! Usage: `groundtruth <reactions.txt> [--experiment YAML] [--species A,B,..] [--output PATH] [--dedup]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use lagchem_dataset::{CausalGraph, EdgeMode, Experiment, write_graph};
use lagchem_runtime::{Species, load_reactions};

#[derive(Parser, Debug)]
#[command(name = "groundtruth")]
#[command(about = "Write the lagged causal graph implied by a reaction network")]
struct Args {
    /// Path to the reaction description
    reactions: PathBuf,

    /// Take the species universe from this experiment's tracked species
    #[arg(long, conflicts_with = "species")]
    experiment: Option<PathBuf>,

    /// Comma-separated species universe
    #[arg(long)]
    species: Option<String>,

    /// Output file
    #[arg(long, default_value = "groundtruth.txt")]
    output: PathBuf,

    /// Keep each distinct edge once
    #[arg(long)]
    dedup: bool,
}

fn main() {
    lagchem_tools::init_logging();

    let args = Args::parse();

    let catalog = match load_reactions(&args.reactions) {
        Ok(c) => c,
        Err(e) => {
            error!(
                "Failed to load reactions '{}': {}",
                args.reactions.display(),
                e
            );
            process::exit(1);
        }
    };

    let universe: Vec<Species> = if let Some(path) = &args.experiment {
        match Experiment::load(path) {
            Ok(experiment) => experiment.tracked_species(),
            Err(e) => {
                error!("Failed to load experiment '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
    } else if let Some(list) = &args.species {
        lagchem_tools::parse_species_list(list)
            .into_iter()
            .map(Species::from)
            .collect()
    } else {
        catalog.species().iter().cloned().collect()
    };

    if universe.is_empty() {
        error!("Species universe is empty");
        process::exit(1);
    }
    for species in universe.iter().filter(|s| !catalog.contains_species(s)) {
        warn!("{} does not appear in any reaction", species);
    }

    let mode = if args.dedup {
        EdgeMode::Set
    } else {
        EdgeMode::Multiset
    };
    let graph = CausalGraph::build(&universe, &catalog, mode);

    if let Err(e) = write_graph(&args.output, &graph) {
        error!("Failed to write graph: {}", e);
        process::exit(1);
    }
    info!(
        "Wrote {} edges ({} self edges) over {} species to {}",
        graph.len(),
        graph.self_edges(),
        universe.len(),
        args.output.display()
    );
}
