//! Experiment System
//!
//! An Experiment describes one dataset recipe: which reaction network to
//! simulate, in what container, which species to seed and how, how many
//! runs to make and where their series go.
//!
//! # Identity
//!
//! Two invocations with:
//! - The same Experiment
//! - The same reaction description
//! - The same seed
//!
//! Must write byte-identical series files under the same names.
//!
//! # File Format
//!
//! Experiments are stored as YAML files:
//!
//! ```yaml
//! apiVersion: lagchem/v1
//! kind: Experiment
//!
//! metadata:
//!   name: krebs3
//!   title: "Three active intermediates"
//!
//! reactions: ../data/krebs.txt
//!
//! container:
//!   size: 50.0
//!   reactionRadius: 4.0
//!   temperature: 293.15
//!   meanFreeTime: 2.0
//!   dt: 0.01
//!
//! steps: 500
//! seed: 42
//!
//! baseline:
//!   GTP: 100
//!   H2O: 600
//!
//! optional:
//!   FUMARATE: 30
//!   MALATE: 100
//!
//! scenarios:
//!   kind: subsets
//!   active: 1
//!
//! naming:
//!   kind: permuted
//!   seed: 42
//!
//! output:
//!   directory: out
//!   prefix: threes
//!   relative: true
//! ```

mod types;


pub use types::*;
