//! lagchem Dataset
//!
//! Turns a reaction network into labeled lagged-causal datasets: scenarios
//! over optional species, noisy initial states, simulated trajectories and
//! the ground-truth graph they are evaluated against.

pub mod driver;
pub mod enumerate;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod pipeline;
pub mod sampler;
pub mod series;
pub mod writer;

pub use driver::{ContainerFactory, EngineFactory, SimulationDriver, seeded_stream};
pub use enumerate::{Scenario, ScenarioPlan, enumerate, naming_permutation, subsets};
pub use error::{DatasetError, Result};
pub use experiment::{ContainerSettings, Experiment, ExperimentMetadata, Naming, OutputSettings};
pub use graph::{CausalEdge, CausalGraph, EdgeMode};
pub use pipeline::{PlannedRun, RunReport, SkippedRun, plan, run_experiment};
pub use sampler::{InitialCounts, InitialStateSampler, NegativeCountPolicy};
pub use series::{AbundanceSeries, CountSeries, TimeSeries, normalize};
pub use writer::{read_series, write_graph, write_series};
