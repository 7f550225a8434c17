//! Particle container
//!
//! A box of point particles with reflective walls. Particles move
//! ballistically; reactions fire either spontaneously (single-reactant
//! rules) or when two particles of a required pair come within the
//! reaction radius (multi-reactant rules). Additional reactant units of
//! larger rules are drawn from the free particles anywhere in the box.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument, trace};

use crate::catalog::ReactionCatalog;
use crate::engine::{ReactionEngine, VelocityGenerator};
use crate::error::{Error, Result};
use crate::types::{Dt, Species, Vec3};

/// Upper bound on grid cells per axis for neighbour search
const MAX_CELLS_PER_AXIS: usize = 64;

/// Geometry and kinetics of a container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerConfig {
    /// Box extent along x, y and z
    pub dimensions: Vec3,
    /// Maximum distance at which two particles can react
    pub reaction_radius: f64,
    /// Mean time between reactive events of one particle
    pub mean_free_time: f64,
}

impl ContainerConfig {
    pub fn new(dim_x: f64, dim_y: f64, dim_z: f64, reaction_radius: f64) -> Self {
        Self {
            dimensions: [dim_x, dim_y, dim_z],
            reaction_radius,
            mean_free_time: 2.0,
        }
    }

    /// Builder method: set the mean free time.
    pub fn with_mean_free_time(mut self, mean_free_time: f64) -> Self {
        self.mean_free_time = mean_free_time;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (axis, extent) in ["x", "y", "z"].iter().zip(self.dimensions) {
            if !(extent > 0.0 && extent.is_finite()) {
                return Err(invalid(
                    &format!("dimension {}", axis),
                    format!("must be positive and finite, got {}", extent),
                ));
            }
        }
        if !(self.reaction_radius > 0.0) {
            return Err(invalid(
                "reaction radius",
                format!("must be positive, got {}", self.reaction_radius),
            ));
        }
        if !(self.mean_free_time > 0.0) {
            return Err(invalid(
                "mean free time",
                format!("must be positive, got {}", self.mean_free_time),
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, message: String) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        message,
    }
}

#[derive(Debug, Clone)]
struct Particle {
    species: usize,
    position: Vec3,
    velocity: Vec3,
}

/// A catalog reaction resolved to species indices
#[derive(Debug, Clone)]
struct Rule {
    products: Vec<usize>,
    /// Encounter probability times catalyst weights
    scale: f64,
}

/// Rule reachable from a particular encounter pair
#[derive(Debug, Clone)]
struct EncounterRule {
    rule: usize,
    /// Reactant units still required besides the encountering pair
    extras: Vec<usize>,
}

/// Reaction simulation over explicit particles
pub struct ParticleContainer {
    config: ContainerConfig,
    species: IndexSet<Species>,
    particles: Vec<Particle>,
    counts: IndexMap<Species, u64>,
    rules: Vec<Rule>,
    /// Single-reactant rules keyed by reactant species index
    unimolecular: HashMap<usize, Vec<usize>>,
    /// Multi-reactant rules keyed by the ordered species pair that triggers them
    encounters: HashMap<(usize, usize), Vec<EncounterRule>>,
    rng: ChaCha8Rng,
    time: f64,
    fired: u64,
    stale: bool,
}

impl ParticleContainer {
    /// Create an empty container whose random stream is seeded from `seed`.
    pub fn new(config: ContainerConfig, catalog: Arc<ReactionCatalog>, seed: u64) -> Result<Self> {
        Self::from_rng(config, catalog, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create an empty container driven by an existing random stream.
    pub fn from_rng(
        config: ContainerConfig,
        catalog: Arc<ReactionCatalog>,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        config.validate()?;

        let species: IndexSet<Species> = catalog.species().iter().cloned().collect();
        let mut rules = Vec::with_capacity(catalog.len());
        let mut unimolecular: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut encounters: HashMap<(usize, usize), Vec<EncounterRule>> = HashMap::new();

        for (rule_idx, reaction) in catalog.iter().enumerate() {
            let reactants = indices(&species, reaction.reactant_list())?;
            let products = indices(&species, reaction.product_list())?;
            let scale = reaction.rate * catalog.catalyst_factor(reaction);
            rules.push(Rule { products, scale });

            if reactants.len() == 1 {
                unimolecular.entry(reactants[0]).or_default().push(rule_idx);
                continue;
            }

            for a in 0..reactants.len() {
                for b in (a + 1)..reactants.len() {
                    let key = pair_key(reactants[a], reactants[b]);
                    let entry = encounters.entry(key).or_default();
                    if entry.iter().any(|e| e.rule == rule_idx) {
                        continue;
                    }
                    let extras = reactants
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != a && *i != b)
                        .map(|(_, s)| *s)
                        .collect();
                    entry.push(EncounterRule {
                        rule: rule_idx,
                        extras,
                    });
                }
            }
        }

        debug!(
            rules = rules.len(),
            unimolecular = unimolecular.len(),
            encounter_pairs = encounters.len(),
            "container created"
        );

        Ok(Self {
            config,
            species,
            particles: Vec::new(),
            counts: IndexMap::new(),
            rules,
            unimolecular,
            encounters,
            rng,
            time: 0.0,
            fired: 0,
            stale: false,
        })
    }

    /// Total reactions fired so far
    pub fn reactions_fired(&self) -> u64 {
        self.fired
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Place `count` particles of `species` uniformly in the box.
    ///
    /// Species unknown to the catalog are accepted; they never react.
    pub fn add_random_particles<G: VelocityGenerator>(
        &mut self,
        generator: &G,
        count: u64,
        species: &Species,
    ) {
        let (index, _) = self.species.insert_full(species.clone());
        let [x, y, z] = self.config.dimensions;
        self.particles.reserve(count as usize);
        for _ in 0..count {
            let position = [
                self.rng.gen_range(0.0..x),
                self.rng.gen_range(0.0..y),
                self.rng.gen_range(0.0..z),
            ];
            let velocity = generator.velocity(&mut self.rng);
            self.particles.push(Particle {
                species: index,
                position,
                velocity,
            });
        }
        self.stale = true;
        trace!(species = %species, count, "particles added");
    }

    /// Rebuild the live counts after seeding. Required before `advance`.
    pub fn update_particle_list(&mut self) {
        self.recount();
        self.stale = false;
    }

    fn recount(&mut self) {
        let mut tally = vec![0u64; self.species.len()];
        for particle in &self.particles {
            tally[particle.species] += 1;
        }
        self.counts = self
            .species
            .iter()
            .zip(tally)
            .filter(|(_, n)| *n > 0)
            .map(|(s, n)| (s.clone(), n))
            .collect();
    }

    fn move_particles(&mut self, dt: f64) {
        let dims = self.config.dimensions;
        for particle in &mut self.particles {
            for d in 0..3 {
                let extent = dims[d];
                let mut x = particle.position[d] + particle.velocity[d] * dt;
                if x < 0.0 {
                    x = -x;
                    particle.velocity[d] = -particle.velocity[d];
                } else if x > extent {
                    x = 2.0 * extent - x;
                    particle.velocity[d] = -particle.velocity[d];
                }
                particle.position[d] = x.clamp(0.0, extent);
            }
        }
    }

    /// Spawn the products of `rule` around `anchor`.
    fn spawn(&mut self, rule: usize, anchor: Vec3, velocity: Vec3, out: &mut Vec<Particle>) {
        let spread = self.config.reaction_radius * 0.5;
        let dims = self.config.dimensions;
        for &species in &self.rules[rule].products {
            let mut position = anchor;
            for d in 0..3 {
                let offset = self.rng.gen_range(-spread..=spread);
                position[d] = (anchor[d] + offset).clamp(0.0, dims[d]);
            }
            out.push(Particle {
                species,
                position,
                velocity,
            });
        }
        self.fired += 1;
    }

    fn firing_probability(&self, rule: usize, step_probability: f64) -> f64 {
        (self.rules[rule].scale * step_probability).clamp(0.0, 1.0)
    }
}

impl ReactionEngine for ParticleContainer {
    #[instrument(skip(self), fields(time = self.time, particles = self.particles.len()))]
    fn advance(&mut self, dt: Dt) -> Result<()> {
        if self.stale {
            return Err(Error::StaleParticleList);
        }
        let dt = dt.seconds();
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(invalid("dt", format!("must be positive and finite, got {}", dt)));
        }

        self.move_particles(dt);

        let step_probability = 1.0 - (-dt / self.config.mean_free_time).exp();
        let n = self.particles.len();
        let mut consumed = vec![false; n];
        let mut available = vec![0u64; self.species.len()];
        let mut by_species: Vec<Vec<usize>> = vec![Vec::new(); self.species.len()];
        for (i, particle) in self.particles.iter().enumerate() {
            available[particle.species] += 1;
            by_species[particle.species].push(i);
        }
        let mut spawned = Vec::new();
        let fired_before = self.fired;

        // Spontaneous conversions
        for i in 0..n {
            let species = self.particles[i].species;
            let Some(rules) = self.unimolecular.get(&species).cloned() else {
                continue;
            };
            for rule in rules {
                let p = self.firing_probability(rule, step_probability);
                if self.rng.gen_bool(p) {
                    consumed[i] = true;
                    available[species] -= 1;
                    let Particle {
                        position, velocity, ..
                    } = self.particles[i].clone();
                    self.spawn(rule, position, velocity, &mut spawned);
                    break;
                }
            }
        }

        // Encounters
        if !self.encounters.is_empty() {
            let grid = CellGrid::build(&self.particles, &self.config);
            let radius_sq = self.config.reaction_radius * self.config.reaction_radius;
            for i in 0..n {
                if consumed[i] {
                    continue;
                }
                for j in grid.neighbours(&self.particles[i].position) {
                    if j <= i || consumed[j] {
                        continue;
                    }
                    if distance_sq(&self.particles[i].position, &self.particles[j].position)
                        > radius_sq
                    {
                        continue;
                    }
                    let (a, b) = (self.particles[i].species, self.particles[j].species);
                    let Some(candidates) = self.encounters.get(&pair_key(a, b)).cloned() else {
                        continue;
                    };
                    for candidate in candidates {
                        if !can_supply(&candidate.extras, &available, a, b) {
                            continue;
                        }
                        let p = self.firing_probability(candidate.rule, step_probability);
                        if !self.rng.gen_bool(p) {
                            continue;
                        }
                        consumed[i] = true;
                        consumed[j] = true;
                        available[a] -= 1;
                        available[b] -= 1;
                        for &extra in &candidate.extras {
                            let free = by_species[extra].iter().copied().find(|k| !consumed[*k]);
                            if let Some(k) = free {
                                consumed[k] = true;
                                available[extra] -= 1;
                            }
                        }
                        let (pi, pj) = (&self.particles[i], &self.particles[j]);
                        let anchor = midpoint(&pi.position, &pj.position);
                        let velocity = midpoint(&pi.velocity, &pj.velocity);
                        self.spawn(candidate.rule, anchor, velocity, &mut spawned);
                        break;
                    }
                    if consumed[i] {
                        break;
                    }
                }
            }
        }

        let fired = self.fired - fired_before;
        if fired > 0 {
            let mut index = 0;
            self.particles.retain(|_| {
                let keep = !consumed[index];
                index += 1;
                keep
            });
            self.particles.extend(spawned);
            self.recount();
        }
        self.time += dt;
        trace!(fired, "step complete");
        Ok(())
    }

    fn current_counts(&self) -> &IndexMap<Species, u64> {
        &self.counts
    }
}

fn indices(species: &IndexSet<Species>, names: Vec<&Species>) -> Result<Vec<usize>> {
    names
        .into_iter()
        .map(|s| {
            species
                .get_index_of(s)
                .ok_or_else(|| Error::UnknownSpecies(s.clone()))
        })
        .collect()
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Whether the free pool holds `extras` once the pair `(a, b)` is taken.
fn can_supply(extras: &[usize], available: &[u64], a: usize, b: usize) -> bool {
    let mut needed: HashMap<usize, u64> = HashMap::new();
    for &s in extras.iter().chain([a, b].iter()) {
        *needed.entry(s).or_insert(0) += 1;
    }
    needed.iter().all(|(s, n)| available[*s] >= *n)
}

fn distance_sq(a: &Vec3, b: &Vec3) -> f64 {
    (0..3).map(|d| (a[d] - b[d]) * (a[d] - b[d])).sum()
}

fn midpoint(a: &Vec3, b: &Vec3) -> Vec3 {
    [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5, (a[2] + b[2]) * 0.5]
}

/// Uniform grid bucketing particle indices by position
struct CellGrid {
    cell_size: Vec3,
    shape: [usize; 3],
    cells: Vec<Vec<usize>>,
}

impl CellGrid {
    fn build(particles: &[Particle], config: &ContainerConfig) -> Self {
        let mut shape = [1usize; 3];
        let mut cell_size = [0.0; 3];
        for d in 0..3 {
            let extent = config.dimensions[d];
            let n = ((extent / config.reaction_radius).floor() as usize)
                .clamp(1, MAX_CELLS_PER_AXIS);
            shape[d] = n;
            cell_size[d] = extent / n as f64;
        }
        let mut grid = Self {
            cell_size,
            shape,
            cells: vec![Vec::new(); shape[0] * shape[1] * shape[2]],
        };
        for (i, particle) in particles.iter().enumerate() {
            let cell = grid.cell_of(&particle.position);
            let idx = grid.flat(cell);
            grid.cells[idx].push(i);
        }
        grid
    }

    fn cell_of(&self, position: &Vec3) -> [usize; 3] {
        let mut cell = [0usize; 3];
        for d in 0..3 {
            let c = (position[d] / self.cell_size[d]).floor().max(0.0) as usize;
            cell[d] = c.min(self.shape[d] - 1);
        }
        cell
    }

    fn flat(&self, cell: [usize; 3]) -> usize {
        (cell[0] * self.shape[1] + cell[1]) * self.shape[2] + cell[2]
    }

    /// Particle indices in the 27-cell neighbourhood of `position`.
    fn neighbours(&self, position: &Vec3) -> Vec<usize> {
        let center = self.cell_of(position);
        let mut out = Vec::new();
        for x in center[0].saturating_sub(1)..=(center[0] + 1).min(self.shape[0] - 1) {
            for y in center[1].saturating_sub(1)..=(center[1] + 1).min(self.shape[1] - 1) {
                for z in center[2].saturating_sub(1)..=(center[2] + 1).min(self.shape[2] - 1) {
                    out.extend_from_slice(&self.cells[self.flat([x, y, z])]);
                }
            }
        }
        out
    }
}
