//! Time series
//!
//! A dense `species × steps` matrix. Rows follow the tracked-species order
//! and never change after a run completes.

use lagchem_runtime::Species;

use crate::error::{DatasetError, Result};

/// Per-species values indexed by step
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    species: Vec<Species>,
    rows: Vec<Vec<T>>,
}

/// Raw particle counts
pub type CountSeries = TimeSeries<u64>;

/// Relative abundances, each step summing to one
pub type AbundanceSeries = TimeSeries<f64>;

impl<T> TimeSeries<T> {
    /// Build a series; every row must have the same number of steps.
    pub fn new(species: Vec<Species>, rows: Vec<Vec<T>>) -> Result<Self> {
        if species.len() != rows.len() {
            return Err(DatasetError::InvalidExperiment(format!(
                "{} species but {} series rows",
                species.len(),
                rows.len()
            )));
        }
        if let Some(first) = rows.first() {
            let steps = first.len();
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != steps) {
                return Err(DatasetError::InvalidExperiment(format!(
                    "row for {} has {} steps, expected {}",
                    species[i],
                    row.len(),
                    steps
                )));
            }
        }
        Ok(Self { species, rows })
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn rows(&self) -> &[Vec<T>] {
        &self.rows
    }

    /// Values of one species, if tracked.
    pub fn row(&self, species: &Species) -> Option<&[T]> {
        self.species
            .iter()
            .position(|s| s == species)
            .map(|i| self.rows[i].as_slice())
    }

    /// Number of recorded steps
    pub fn steps(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Species, &[T])> {
        self.species
            .iter()
            .zip(self.rows.iter().map(|r| r.as_slice()))
    }
}

impl CountSeries {
    /// Sum of all tracked counts at step `t`.
    pub fn step_total(&self, t: usize) -> u64 {
        self.rows.iter().map(|r| r[t]).sum()
    }
}

/// Convert counts to relative abundances.
///
/// Fails on the first step where every tracked species is at zero.
pub fn normalize(series: &CountSeries) -> Result<AbundanceSeries> {
    let steps = series.steps();
    let mut totals = Vec::with_capacity(steps);
    for t in 0..steps {
        let total = series.step_total(t);
        if total == 0 {
            return Err(DatasetError::DegenerateStep { step: t });
        }
        totals.push(total as f64);
    }

    let rows: Vec<Vec<f64>> = series
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(&totals)
                .map(|(count, total)| *count as f64 / total)
                .collect()
        })
        .collect();

    TimeSeries::new(series.species().to_vec(), rows)
}
