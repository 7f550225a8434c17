//! Runtime errors

use thiserror::Error;

use crate::types::Species;

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("{line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to read reaction description {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("species not found: {0}")]
    UnknownSpecies(Species),

    #[error("invalid value for {name}: {message}")]
    InvalidParameter { name: String, message: String },

    #[error("particle list is stale: call update_particle_list() after seeding")]
    StaleParticleList,
}
