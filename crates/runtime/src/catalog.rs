//! Reaction catalog
//!
//! The parsed, read-only description of a reaction network. A catalog is
//! built once per process and shared (behind an `Arc`) by every engine
//! instance; nothing mutates it after parsing.

use indexmap::{IndexMap, IndexSet};

use crate::types::Species;

/// A single reaction rule
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Consumed species and their weights
    pub reactants: IndexMap<Species, f64>,
    /// Produced species and their weights
    pub products: IndexMap<Species, f64>,
    /// Probability that an eligible encounter fires, in (0, 1]
    pub rate: f64,
}

impl Reaction {
    pub fn new(reactants: IndexMap<Species, f64>, products: IndexMap<Species, f64>) -> Self {
        Self {
            reactants,
            products,
            rate: 1.0,
        }
    }

    /// Builder method: set the encounter probability.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Number of reactant particles consumed by one firing.
    pub fn reactant_units(&self) -> u32 {
        self.reactants.values().map(|w| weight_units(*w)).sum()
    }

    /// Reactant species expanded by weight, in declaration order.
    pub fn reactant_list(&self) -> Vec<&Species> {
        expand(&self.reactants)
    }

    /// Product species expanded by weight, in declaration order.
    pub fn product_list(&self) -> Vec<&Species> {
        expand(&self.products)
    }

    /// True when a species appears on both sides.
    pub fn is_catalytic(&self) -> bool {
        self.reactants.keys().any(|s| self.products.contains_key(s))
    }
}

/// Integer particle count represented by a weight
pub fn weight_units(weight: f64) -> u32 {
    (weight.round() as u32).max(1)
}

fn expand(side: &IndexMap<Species, f64>) -> Vec<&Species> {
    side.iter()
        .flat_map(|(species, weight)| std::iter::repeat_n(species, weight_units(*weight) as usize))
        .collect()
}

/// Parsed reaction network plus catalyst weights
#[derive(Debug, Clone, Default)]
pub struct ReactionCatalog {
    reactions: Vec<Reaction>,
    /// Every species mentioned by a reaction or catalyst line, first mention first
    species: IndexSet<Species>,
    catalysts: IndexMap<Species, f64>,
}

impl ReactionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reaction: Reaction) {
        for species in reaction.reactants.keys().chain(reaction.products.keys()) {
            self.species.insert(species.clone());
        }
        self.reactions.push(reaction);
    }

    /// Builder method: append a reaction.
    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.push(reaction);
        self
    }

    pub fn set_catalyst(&mut self, species: Species, weight: f64) {
        self.species.insert(species.clone());
        self.catalysts.insert(species, weight);
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reaction> {
        self.reactions.iter()
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn species(&self) -> &IndexSet<Species> {
        &self.species
    }

    pub fn contains_species(&self, species: &Species) -> bool {
        self.species.contains(species)
    }

    pub fn catalysts(&self) -> &IndexMap<Species, f64> {
        &self.catalysts
    }

    /// Product of catalyst weights over the reaction's reactants.
    pub fn catalyst_factor(&self, reaction: &Reaction) -> f64 {
        reaction
            .reactants
            .keys()
            .filter_map(|s| self.catalysts.get(s))
            .product()
    }
}

impl<'a> IntoIterator for &'a ReactionCatalog {
    type Item = &'a Reaction;
    type IntoIter = std::slice::Iter<'a, Reaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.reactions.iter()
    }
}
