//! Integration test harness for lagchem.
//!
//! This crate provides utilities for end-to-end testing of the dataset
//! pipeline: Parse → Plan → Sample → Simulate → Write → Read back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tempfile::TempDir;

use lagchem_dataset::{
    AbundanceSeries, CountSeries, EngineFactory, Experiment, InitialCounts, RunReport, read_series,
    run_experiment,
};
use lagchem_runtime::{Dt, ReactionCatalog, ReactionEngine, Species, parse_reactions};

/// Rule applied by a [`ScriptedEngine`] at every step.
///
/// Receives the zero-based step and the live counts.
pub type StepRule = fn(usize, &mut IndexMap<Species, u64>);

/// Engine that applies a fixed rule instead of running physics
pub struct ScriptedEngine {
    counts: IndexMap<Species, u64>,
    step: usize,
    rule: StepRule,
}

impl ReactionEngine for ScriptedEngine {
    fn advance(&mut self, _dt: Dt) -> lagchem_runtime::Result<()> {
        (self.rule)(self.step, &mut self.counts);
        self.counts.retain(|_, n| *n > 0);
        self.step += 1;
        Ok(())
    }

    fn current_counts(&self) -> &IndexMap<Species, u64> {
        &self.counts
    }
}

/// Builds [`ScriptedEngine`]s seeded with the sampled initial counts
pub struct ScriptedFactory {
    rule: StepRule,
}

impl ScriptedFactory {
    pub fn new(rule: StepRule) -> Self {
        Self { rule }
    }

    /// Counts never change.
    pub fn frozen() -> Self {
        Self::new(|_, _| {})
    }
}

impl EngineFactory for ScriptedFactory {
    type Engine = ScriptedEngine;

    fn build(
        &self,
        _catalog: &Arc<ReactionCatalog>,
        initial: &InitialCounts,
        _seed: u64,
    ) -> lagchem_dataset::Result<ScriptedEngine> {
        Ok(ScriptedEngine {
            counts: initial
                .iter()
                .filter(|(_, n)| *n > 0)
                .map(|(s, n)| (s.clone(), n))
                .collect(),
            step: 0,
            rule: self.rule,
        })
    }
}

/// Test harness owning a reaction catalog and a scratch output directory.
pub struct TestHarness {
    catalog: Arc<ReactionCatalog>,
    dir: TempDir,
}

impl TestHarness {
    /// Create a harness from reaction-description source.
    ///
    /// # Panics
    ///
    /// Panics if the source does not parse or no temp dir can be created.
    pub fn from_reactions(source: &str) -> Self {
        let catalog = match parse_reactions(source) {
            Ok(c) => c,
            Err(e) => panic!("Reaction description failed to parse: {}", e),
        };
        Self {
            catalog: Arc::new(catalog),
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Create a harness from the shipped citric-acid-cycle description.
    pub fn krebs() -> Self {
        let source = std::fs::read_to_string(workspace_root().join("data/krebs.txt"))
            .expect("failed to read data/krebs.txt");
        Self::from_reactions(&source)
    }

    pub fn catalog(&self) -> &ReactionCatalog {
        &self.catalog
    }

    /// Scratch directory removed when the harness drops.
    pub fn output_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Point `experiment` at the scratch directory, keeping its prefix.
    pub fn redirect(&self, mut experiment: Experiment) -> Experiment {
        experiment.output.directory = self.output_dir().to_path_buf();
        experiment
    }

    /// Run with a custom engine factory.
    pub fn run<F: EngineFactory>(&self, experiment: &Experiment, factory: &F) -> RunReport {
        match run_experiment(experiment, Arc::clone(&self.catalog), factory) {
            Ok(report) => report,
            Err(e) => panic!("Experiment failed: {}", e),
        }
    }

    /// Run with the particle-container engine the experiment describes.
    pub fn run_container(&self, experiment: &Experiment) -> RunReport {
        self.run(experiment, &experiment.container_factory())
    }

    pub fn read_counts(&self, path: &Path) -> CountSeries {
        read_series(path).expect("failed to read count series")
    }

    pub fn read_abundances(&self, path: &Path) -> AbundanceSeries {
        read_series(path).expect("failed to read abundance series")
    }
}

/// Root of the workspace, for locating shipped data and experiments.
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}
