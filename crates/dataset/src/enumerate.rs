//! Scenario enumeration
//!
//! A scenario is a bitmask over the optional species: bit `i` set means the
//! `i`-th optional species is seeded for that run. Baseline species are
//! always seeded and are not part of the mask.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use lagchem_runtime::Species;

use crate::error::{DatasetError, Result};

/// Widest optional-species list a mask can describe
pub const MAX_OPTIONAL: usize = 63;

/// How the runs of an experiment are chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScenarioPlan {
    /// Every subset of exactly `active` optional species
    Subsets { active: usize },
    /// `runs` independent runs with every optional species active
    Repeat { runs: usize },
}

impl Default for ScenarioPlan {
    fn default() -> Self {
        ScenarioPlan::Repeat { runs: 1 }
    }
}

/// One configuration of active optional species
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    /// Position in enumeration order
    pub index: usize,
    /// Active optional species, bit `i` for `optional[i]`
    pub mask: u64,
}

impl Scenario {
    pub fn is_active(&self, bit: usize) -> bool {
        bit < 64 && self.mask & (1 << bit) != 0
    }

    /// The optional species this scenario activates, in list order.
    pub fn active<'a>(&self, optional: &'a [Species]) -> Vec<&'a Species> {
        optional
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.is_active(*bit))
            .map(|(_, s)| s)
            .collect()
    }
}

/// Every mask in `[0, 2^m)` with exactly `k` bits set, in increasing order.
pub fn subsets(m: usize, k: usize) -> Result<Vec<u64>> {
    if m > MAX_OPTIONAL {
        return Err(DatasetError::InvalidExperiment(format!(
            "{} optional species exceed the limit of {}",
            m, MAX_OPTIONAL
        )));
    }
    if k > m {
        return Ok(Vec::new());
    }
    if k == 0 {
        return Ok(vec![0]);
    }

    // Gosper's hack walks same-popcount masks in increasing order
    let limit = 1u64 << m;
    let mut masks = Vec::new();
    let mut mask = (1u64 << k) - 1;
    while mask < limit {
        masks.push(mask);
        let lowest = mask & mask.wrapping_neg();
        let ripple = mask + lowest;
        mask = (((ripple ^ mask) >> 2) / lowest) | ripple;
    }
    Ok(masks)
}

/// Expand a plan into concrete scenarios over `optional_count` species.
pub fn enumerate(plan: &ScenarioPlan, optional_count: usize) -> Result<Vec<Scenario>> {
    let masks = match plan {
        ScenarioPlan::Subsets { active } => subsets(optional_count, *active)?,
        ScenarioPlan::Repeat { runs } => {
            if optional_count > MAX_OPTIONAL {
                return Err(DatasetError::InvalidExperiment(format!(
                    "{} optional species exceed the limit of {}",
                    optional_count, MAX_OPTIONAL
                )));
            }
            let all = if optional_count == 0 {
                0
            } else {
                u64::MAX >> (64 - optional_count)
            };
            vec![all; *runs]
        }
    };
    Ok(masks
        .into_iter()
        .enumerate()
        .map(|(index, mask)| Scenario { index, mask })
        .collect())
}

/// Top-down Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// A seeded permutation of `1..=n` used to name outputs.
pub fn naming_permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut permutation: Vec<usize> = (1..=n).collect();
    shuffle(&mut permutation, &mut rng);
    permutation
}
