//! Ground-truth causal graph
//!
//! Every species persists (`X_lag1 → X_lag0`) and every reactant of a
//! reaction influences every product of it (`R_lag1 → P_lag0`). The graph
//! depends only on the catalog and the species universe, never on which
//! species a particular run happened to seed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use lagchem_runtime::{ReactionCatalog, Species};

/// Whether repeated edges are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeMode {
    /// One edge per (reactant, product) pair per reaction
    #[default]
    Multiset,
    /// Each distinct edge once, first occurrence kept
    Set,
}

/// A lag-1 → lag-0 edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CausalEdge {
    pub source: Species,
    pub target: Species,
}

impl CausalEdge {
    pub fn new(source: Species, target: Species) -> Self {
        Self { source, target }
    }

    /// Node name of the lag-1 end
    pub fn source_node(&self) -> String {
        self.source.lag1()
    }

    /// Node name of the lag-0 end
    pub fn target_node(&self) -> String {
        self.target.lag0()
    }

    pub fn is_self_edge(&self) -> bool {
        self.source == self.target
    }
}

/// Ordered edge list: self edges first, then reaction edges in catalog order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CausalGraph {
    edges: Vec<CausalEdge>,
}

impl CausalGraph {
    /// Build the graph over `universe` from `catalog`.
    pub fn build<'a>(
        universe: impl IntoIterator<Item = &'a Species>,
        catalog: &ReactionCatalog,
        mode: EdgeMode,
    ) -> Self {
        let mut edges: Vec<CausalEdge> = universe
            .into_iter()
            .map(|s| CausalEdge::new(s.clone(), s.clone()))
            .collect();

        for reaction in catalog {
            for source in reaction.reactants.keys() {
                for target in reaction.products.keys() {
                    edges.push(CausalEdge::new(source.clone(), target.clone()));
                }
            }
        }

        if mode == EdgeMode::Set {
            let mut seen = HashSet::new();
            edges.retain(|edge| seen.insert(edge.clone()));
        }

        Self { edges }
    }

    pub fn edges(&self) -> &[CausalEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn self_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.is_self_edge()).count()
    }

    pub fn contains(&self, source: &Species, target: &Species) -> bool {
        self.edges
            .iter()
            .any(|e| &e.source == source && &e.target == target)
    }

    /// Edges as `(source_lag1, target_lag0)` node-name pairs.
    pub fn node_pairs(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.edges
            .iter()
            .map(|e| (e.source_node(), e.target_node()))
    }
}
