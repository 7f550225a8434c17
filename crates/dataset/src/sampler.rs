//! Initial-state sampling
//!
//! Each seeded species gets `round(z · μ/3 + μ)` particles, `z` a standard
//! normal draw. All draws of a run come from one stream, in the order the
//! species are listed, so a seed fixes the whole initial state.

use indexmap::IndexMap;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lagchem_runtime::Species;

use crate::error::{DatasetError, Result};

/// Redraws attempted by [`NegativeCountPolicy::Resample`] before clamping
pub const MAX_RESAMPLES: usize = 64;

/// What to do when the Gaussian draw comes out negative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NegativeCountPolicy {
    /// Use zero particles
    #[default]
    Clamp,
    /// Draw again, clamping after [`MAX_RESAMPLES`] failures
    Resample,
    /// Fail the scenario
    Reject,
}

/// Validated initial particle counts for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialCounts {
    counts: IndexMap<Species, u64>,
}

impl InitialCounts {
    /// Build counts from raw draws. Negative values are rejected.
    pub fn new(entries: impl IntoIterator<Item = (Species, i64)>) -> Result<Self> {
        let mut counts = IndexMap::new();
        for (species, value) in entries {
            if value < 0 {
                return Err(DatasetError::NegativeCount { species, value });
            }
            counts.insert(species, value as u64);
        }
        Ok(Self { counts })
    }

    pub fn get(&self, species: &Species) -> Option<u64> {
        self.counts.get(species).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Species, u64)> {
        self.counts.iter().map(|(s, n)| (s, *n))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// One noisy count around `mean`.
pub fn gaussian_count<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> i64 {
    let z: f64 = StandardNormal.sample(rng);
    (z * mean / 3.0 + mean).round() as i64
}

/// Draws initial counts under a negative-count policy
#[derive(Debug, Clone, Copy, Default)]
pub struct InitialStateSampler {
    policy: NegativeCountPolicy,
}

impl InitialStateSampler {
    pub fn new(policy: NegativeCountPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> NegativeCountPolicy {
        self.policy
    }

    /// Sample every `(species, mean)` target in order from `rng`.
    pub fn sample<'a, R, I>(&self, rng: &mut R, targets: I) -> Result<InitialCounts>
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = (&'a Species, f64)>,
    {
        let mut draws = Vec::new();
        for (species, mean) in targets {
            let value = self.draw(rng, species, mean)?;
            draws.push((species.clone(), value));
        }
        InitialCounts::new(draws)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R, species: &Species, mean: f64) -> Result<i64> {
        let value = gaussian_count(rng, mean);
        if value >= 0 {
            return Ok(value);
        }
        match self.policy {
            NegativeCountPolicy::Clamp => {
                debug!(species = %species, value, "negative draw clamped");
                Ok(0)
            }
            NegativeCountPolicy::Reject => Err(DatasetError::NegativeCount {
                species: species.clone(),
                value,
            }),
            NegativeCountPolicy::Resample => {
                for _ in 0..MAX_RESAMPLES {
                    let value = gaussian_count(rng, mean);
                    if value >= 0 {
                        return Ok(value);
                    }
                }
                warn!(species = %species, mean, "resampling kept failing, clamping to zero");
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn species(names: &[&str]) -> Vec<Species> {
        names.iter().map(|s| Species::from(*s)).collect()
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let names = species(&["FUMARATE", "GTP", "H2O"]);
        let targets = || names.iter().zip([30.0, 100.0, 600.0]);
        let sampler = InitialStateSampler::default();

        let first = sampler
            .sample(&mut ChaCha8Rng::seed_from_u64(42), targets())
            .unwrap();
        let second = sampler
            .sample(&mut ChaCha8Rng::seed_from_u64(42), targets())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_mean_thirty_matches_formula() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut reference = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let z: f64 = StandardNormal.sample(&mut reference);
            assert_eq!(gaussian_count(&mut rng, 30.0), (z * 10.0 + 30.0).round() as i64);
        }
    }

    #[test]
    fn test_draw_order_matters() {
        let names = species(&["A", "B"]);
        let sampler = InitialStateSampler::default();
        let forward = sampler
            .sample(&mut ChaCha8Rng::seed_from_u64(1), names.iter().zip([30.0, 900.0]))
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let first_draw = gaussian_count(&mut rng, 30.0);
        assert_eq!(forward.get(&Species::from("A")), Some(first_draw.max(0) as u64));
    }

    #[test]
    fn test_sample_mean_tracks_target() {
        let names = species(&["X"]);
        let sampler = InitialStateSampler::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let n = 2000;
        let total: u64 = (0..n)
            .map(|_| {
                sampler
                    .sample(&mut rng, names.iter().zip([300.0]))
                    .unwrap()
                    .total()
            })
            .sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 300.0).abs() < 10.0, "mean {mean}");
    }

    #[test]
    fn test_spread_is_a_third_of_a_small_mean() {
        // μ = 5 gives sd 5/3 plus rounding noise; a floored μ/3 would give about 1.
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let draws: Vec<f64> = (0..20_000)
            .map(|_| gaussian_count(&mut rng, 5.0) as f64)
            .collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        let sd = var.sqrt();
        assert!((1.55..1.85).contains(&sd), "sd {sd}");
    }

    // A draw is negative when z < -3 - 1.5/μ, roughly 0.13% of draws for
    // large means, so 20k draws hit the tail a few dozen times.
    const TAIL_DRAWS: usize = 20_000;

    #[test]
    fn test_clamp_policy_turns_negative_draws_into_zero() {
        let names = species(&["TAIL"]);
        let sampler = InitialStateSampler::new(NegativeCountPolicy::Clamp);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let zeros = (0..TAIL_DRAWS)
            .map(|_| sampler.sample(&mut rng, names.iter().zip([1000.0])).unwrap())
            .filter(|counts| counts.get(&Species::from("TAIL")) == Some(0))
            .count();
        assert!(zeros > 0);
    }

    #[test]
    fn test_resample_policy_always_succeeds() {
        let names = species(&["TAIL"]);
        let sampler = InitialStateSampler::new(NegativeCountPolicy::Resample);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..TAIL_DRAWS {
            assert!(sampler.sample(&mut rng, names.iter().zip([1000.0])).is_ok());
        }
    }

    #[test]
    fn test_reject_policy_surfaces_negative_draw() {
        let names = species(&["TAIL"]);
        let sampler = InitialStateSampler::new(NegativeCountPolicy::Reject);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rejected = (0..TAIL_DRAWS)
            .filter(|_| sampler.sample(&mut rng, names.iter().zip([1000.0])).is_err())
            .count();
        assert!(rejected > 0 && rejected < TAIL_DRAWS / 100);
    }

    #[test]
    fn test_initial_counts_reject_negative_values() {
        let err =
            InitialCounts::new([(Species::from("A"), 3), (Species::from("B"), -1)]).unwrap_err();
        assert!(matches!(err, DatasetError::NegativeCount { value: -1, .. }));
    }
}
