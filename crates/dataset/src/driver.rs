//! Simulation driving
//!
//! Builds a seeded engine for each run and records the tracked species
//! after every step.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

use lagchem_runtime::{
    BoltzmannGenerator, ContainerConfig, Dt, ParticleContainer, ReactionCatalog, ReactionEngine,
    Species,
};

use crate::error::Result;
use crate::sampler::InitialCounts;
use crate::series::{CountSeries, TimeSeries};

/// Stream of a run's seed used for initial-state sampling
pub const SAMPLER_STREAM: u64 = 0;
/// Stream of a run's seed used by the engine
pub const ENGINE_STREAM: u64 = 1;

/// Independent random stream `stream` derived from `seed`.
pub fn seeded_stream(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Builds a ready-to-step engine for one run.
pub trait EngineFactory: Sync {
    type Engine: ReactionEngine;

    fn build(
        &self,
        catalog: &Arc<ReactionCatalog>,
        initial: &InitialCounts,
        seed: u64,
    ) -> Result<Self::Engine>;
}

/// Factory for [`ParticleContainer`] engines seeded with Boltzmann velocities
#[derive(Debug, Clone)]
pub struct ContainerFactory {
    pub config: ContainerConfig,
    pub temperature: f64,
}

impl ContainerFactory {
    pub fn new(config: ContainerConfig, temperature: f64) -> Self {
        Self {
            config,
            temperature,
        }
    }
}

impl EngineFactory for ContainerFactory {
    type Engine = ParticleContainer;

    fn build(
        &self,
        catalog: &Arc<ReactionCatalog>,
        initial: &InitialCounts,
        seed: u64,
    ) -> Result<ParticleContainer> {
        let rng = seeded_stream(seed, ENGINE_STREAM);
        let mut container =
            ParticleContainer::from_rng(self.config.clone(), Arc::clone(catalog), rng)?;
        let generator = BoltzmannGenerator::new(self.temperature)?;
        for (species, count) in initial.iter() {
            container.add_random_particles(&generator, count, species);
        }
        container.update_particle_list();
        debug!(particles = container.particle_count(), seed, "container seeded");
        Ok(container)
    }
}

/// Advances an engine a fixed number of steps and records counts
#[derive(Debug, Clone, Copy)]
pub struct SimulationDriver {
    steps: usize,
    dt: Dt,
}

impl SimulationDriver {
    pub fn new(steps: usize, dt: Dt) -> Self {
        Self { steps, dt }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn dt(&self) -> Dt {
        self.dt
    }

    /// Run the engine and record `tracked` after each step.
    ///
    /// A species missing from the engine's counts is recorded as zero.
    #[instrument(skip_all, fields(steps = self.steps, tracked = tracked.len()))]
    pub fn run<E: ReactionEngine + ?Sized>(
        &self,
        engine: &mut E,
        tracked: &[Species],
    ) -> Result<CountSeries> {
        let mut rows: Vec<Vec<u64>> = vec![Vec::with_capacity(self.steps); tracked.len()];
        for t in 0..self.steps {
            engine.advance(self.dt)?;
            for (row, species) in rows.iter_mut().zip(tracked) {
                row.push(engine.current_count(species).unwrap_or(0));
            }
            trace!(step = t, "recorded");
        }
        TimeSeries::new(tracked.to_vec(), rows)
    }
}
