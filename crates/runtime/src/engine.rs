//! Engine capabilities
//!
//! The dataset layer only ever talks to a simulation through these traits:
//! it advances the engine and reads back live counts. Anything that can do
//! both (the particle container, or a scripted fake in tests) can drive a
//! dataset run.

use indexmap::IndexMap;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{Error, Result};
use crate::types::{Dt, Species, Vec3};

/// A steppable reaction simulation with observable species counts.
pub trait ReactionEngine {
    /// Advance the simulation by one step. Blocks until the step is done.
    fn advance(&mut self, dt: Dt) -> Result<()>;

    /// Live particle counts. Species with no particles may be absent.
    fn current_counts(&self) -> &IndexMap<Species, u64>;

    /// Live count of one species; `None` means no particles are present.
    fn current_count(&self, species: &Species) -> Option<u64> {
        self.current_counts().get(species).copied()
    }
}

/// Source of initial particle velocities.
pub trait VelocityGenerator {
    fn velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3;
}

/// Boltzmann constant in the container's reduced units
pub const BOLTZMANN: f64 = 1.0;

/// Maxwell-Boltzmann velocity sampling at a fixed temperature.
///
/// Each component is drawn from `N(0, sqrt(k·T/m))`.
#[derive(Debug, Clone)]
pub struct BoltzmannGenerator {
    temperature: f64,
    mass: f64,
    normal: Normal<f64>,
}

impl BoltzmannGenerator {
    pub fn new(temperature: f64) -> Result<Self> {
        Self::with_mass(temperature, 1.0)
    }

    pub fn with_mass(temperature: f64, mass: f64) -> Result<Self> {
        if !(temperature > 0.0) {
            return Err(Error::InvalidParameter {
                name: "temperature".to_string(),
                message: format!("must be positive, got {}", temperature),
            });
        }
        if !(mass > 0.0) {
            return Err(Error::InvalidParameter {
                name: "mass".to_string(),
                message: format!("must be positive, got {}", mass),
            });
        }
        let sigma = (BOLTZMANN * temperature / mass).sqrt();
        let normal = Normal::new(0.0, sigma).map_err(|e| Error::InvalidParameter {
            name: "temperature".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            temperature,
            mass,
            normal,
        })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Standard deviation of each velocity component
    pub fn sigma(&self) -> f64 {
        self.normal.std_dev()
    }
}

impl VelocityGenerator for BoltzmannGenerator {
    fn velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        [
            self.normal.sample(rng),
            self.normal.sample(rng),
            self.normal.sample(rng),
        ]
    }
}
