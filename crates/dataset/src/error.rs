//! Dataset errors

use std::path::PathBuf;

use thiserror::Error;

use lagchem_runtime::Species;

/// Dataset result type
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Errors raised while defining, running or writing an experiment.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to read or write a file.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the experiment YAML.
    #[error("failed to parse experiment YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid API version.
    #[error("invalid apiVersion: expected 'lagchem/v1', got '{0}'")]
    InvalidApiVersion(String),

    /// Invalid kind.
    #[error("invalid kind: expected 'Experiment', got '{0}'")]
    InvalidKind(String),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The experiment definition is inconsistent.
    #[error("invalid experiment: {0}")]
    InvalidExperiment(String),

    /// Error from the reaction catalog or engine.
    #[error(transparent)]
    Runtime(#[from] lagchem_runtime::Error),

    /// Every tracked species had zero particles at a step.
    #[error("degenerate step {step}: all tracked species have zero count")]
    DegenerateStep { step: usize },

    /// A sampled initial count was negative and the policy rejects it.
    #[error("negative initial count {value} for {species}")]
    NegativeCount { species: Species, value: i64 },

    /// A time-series file could not be parsed.
    #[error("malformed series at line {line}: {message}")]
    MalformedSeries { line: usize, message: String },

    /// Two runs were assigned the same output file.
    #[error("output file assigned twice: {0}")]
    DuplicateOutput(PathBuf),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            source,
        }
    }
}
