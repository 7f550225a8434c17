//! Experiment pipeline
//!
//! Plans every run of an experiment up front (scenario, seed, file name),
//! then samples, simulates, normalizes and writes each one. A run that
//! fails is logged and skipped; the rest still complete.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use lagchem_runtime::{ReactionCatalog, Species};

use crate::driver::{EngineFactory, SAMPLER_STREAM, SimulationDriver, seeded_stream};
use crate::enumerate::{Scenario, enumerate, naming_permutation};
use crate::error::{DatasetError, Result};
use crate::experiment::{Experiment, Naming};
use crate::sampler::InitialStateSampler;
use crate::series::normalize;
use crate::writer::write_series;

/// One run, fully determined before anything is simulated
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRun {
    pub scenario: Scenario,
    /// Seed of the run's sampler and engine streams
    pub seed: u64,
    /// Active optional species, in bit order
    pub active: Vec<Species>,
    pub path: PathBuf,
}

/// A run that did not produce a file
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRun {
    pub index: usize,
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of [`run_experiment`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Files written, in run order
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedRun>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.skipped.len()
    }
}

/// Expand an experiment into its runs.
///
/// Fails when the experiment is invalid or when the naming scheme would
/// give two runs the same file.
pub fn plan(experiment: &Experiment) -> Result<Vec<PlannedRun>> {
    experiment.validate()?;
    let optional: Vec<Species> = experiment
        .optional_species()
        .into_iter()
        .map(|(species, _)| species)
        .collect();
    let scenarios = enumerate(&experiment.scenarios, optional.len())?;

    let permutation = match experiment.naming {
        Naming::Permuted { seed } => naming_permutation(scenarios.len(), seed),
        _ => Vec::new(),
    };
    if experiment.naming == Naming::Fixed && scenarios.len() > 1 {
        return Err(DatasetError::InvalidExperiment(format!(
            "fixed naming needs a single run, experiment has {}",
            scenarios.len()
        )));
    }

    let output = &experiment.output;
    let mut seen = HashSet::new();
    let mut runs = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let seed = experiment.seed.wrapping_add(scenario.index as u64);
        let name = match experiment.naming {
            Naming::Fixed => format!("{}.tsv", output.prefix),
            Naming::Seeded => format!("{}{}.tsv", output.prefix, seed),
            Naming::Permuted { .. } => {
                format!("{}{}.tsv", output.prefix, permutation[scenario.index])
            }
        };
        let path = output.directory.join(name);
        if !seen.insert(path.clone()) {
            return Err(DatasetError::DuplicateOutput(path));
        }
        runs.push(PlannedRun {
            scenario,
            seed,
            active: scenario.active(&optional).into_iter().cloned().collect(),
            path,
        });
    }
    Ok(runs)
}

/// Shared read-only state of one experiment execution
struct RunContext<'a, F> {
    experiment: &'a Experiment,
    catalog: Arc<ReactionCatalog>,
    factory: &'a F,
    sampler: InitialStateSampler,
    driver: SimulationDriver,
    baseline: Vec<(Species, f64)>,
    optional: Vec<(Species, f64)>,
    tracked: Vec<Species>,
}

impl<F: EngineFactory> RunContext<'_, F> {
    #[instrument(skip_all, fields(scenario = run.scenario.index, seed = run.seed))]
    fn execute(&self, run: &PlannedRun) -> Result<PathBuf> {
        let mut rng = seeded_stream(run.seed, SAMPLER_STREAM);
        let active = self
            .optional
            .iter()
            .enumerate()
            .filter(|(bit, _)| run.scenario.is_active(*bit))
            .map(|(_, (species, mean))| (species, *mean));
        let targets = self
            .baseline
            .iter()
            .map(|(species, mean)| (species, *mean))
            .chain(active);
        let initial = self.sampler.sample(&mut rng, targets)?;

        let mut engine = self.factory.build(&self.catalog, &initial, run.seed)?;
        let counts = self.driver.run(&mut engine, &self.tracked)?;

        if self.experiment.output.relative {
            write_series(&run.path, &normalize(&counts)?)?;
        } else {
            write_series(&run.path, &counts)?;
        }
        info!(path = %run.path.display(), particles = initial.total(), "dataset written");
        Ok(run.path.clone())
    }
}

/// Run every scenario of `experiment` and write its series.
///
/// The experiment itself must be valid; individual runs that fail are
/// reported in [`RunReport::skipped`].
#[instrument(skip_all, fields(experiment = %experiment.metadata.name))]
pub fn run_experiment<F: EngineFactory>(
    experiment: &Experiment,
    catalog: Arc<ReactionCatalog>,
    factory: &F,
) -> Result<RunReport> {
    let runs = plan(experiment)?;
    for species in experiment.unknown_species(&catalog) {
        warn!(species = %species, "species does not appear in any reaction");
    }

    let context = RunContext {
        experiment,
        catalog,
        factory,
        sampler: InitialStateSampler::new(experiment.negative_counts),
        driver: SimulationDriver::new(experiment.steps, experiment.dt()),
        baseline: experiment.baseline_species(),
        optional: experiment.optional_species(),
        tracked: experiment.tracked_species(),
    };
    info!(runs = runs.len(), parallel = experiment.parallel, "starting experiment");

    let outcomes: Vec<Result<PathBuf>> = if experiment.parallel {
        runs.par_iter().map(|run| context.execute(run)).collect()
    } else {
        runs.iter().map(|run| context.execute(run)).collect()
    };

    let mut report = RunReport::default();
    for (run, outcome) in runs.iter().zip(outcomes) {
        match outcome {
            Ok(path) => report.written.push(path),
            Err(e) => {
                warn!(
                    scenario = run.scenario.index,
                    path = %run.path.display(),
                    error = %e,
                    "run skipped"
                );
                report.skipped.push(SkippedRun {
                    index: run.scenario.index,
                    path: run.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "experiment complete"
    );
    Ok(report)
}
