//! lagchem Runtime
//!
//! Reaction catalog, reaction-description parsing, and the particle
//! simulation that generates species trajectories.

pub mod catalog;
pub mod container;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;

pub use catalog::{Reaction, ReactionCatalog};
pub use container::{ContainerConfig, ParticleContainer};
pub use engine::{BoltzmannGenerator, ReactionEngine, VelocityGenerator};
pub use error::{Error, Result};
pub use parser::{load_reactions, parse_reactions};
pub use types::*;
