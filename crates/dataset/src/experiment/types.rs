//! Experiment type definitions and loading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use lagchem_runtime::{ContainerConfig, Dt, ReactionCatalog, Species};

use crate::driver::ContainerFactory;
use crate::enumerate::{MAX_OPTIONAL, ScenarioPlan};
use crate::error::{DatasetError, Result};
use crate::sampler::NegativeCountPolicy;

const API_VERSION: &str = "lagchem/v1";
const KIND: &str = "Experiment";

/// A dataset recipe.
///
/// Experiments provide:
/// - Metadata (name, title, description)
/// - The reaction description and container geometry
/// - Baseline and optional species with their target means
/// - The scenario plan, seed and output naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// API version for compatibility checking.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Kind must be "Experiment".
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Experiment metadata.
    #[serde(default)]
    pub metadata: ExperimentMetadata,

    /// Reaction description file, relative to the experiment file.
    #[serde(default)]
    pub reactions: Option<PathBuf>,

    /// Container geometry and kinetics.
    #[serde(default)]
    pub container: ContainerSettings,

    /// Recorded steps per run.
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Base seed; run `i` uses `seed + i`.
    #[serde(default)]
    pub seed: u64,

    /// Species seeded in every run, with their target means.
    #[serde(default)]
    pub baseline: IndexMap<String, f64>,

    /// Species switched on per scenario, with their target means.
    /// Bit `i` of a scenario mask refers to the `i`-th entry.
    #[serde(default)]
    pub optional: IndexMap<String, f64>,

    /// Output row order. Empty means baseline then optional.
    #[serde(default)]
    pub tracked: Vec<String>,

    /// Which scenarios to run.
    #[serde(default)]
    pub scenarios: ScenarioPlan,

    /// How output files are named.
    #[serde(default)]
    pub naming: Naming,

    /// Where output files go.
    #[serde(default)]
    pub output: OutputSettings,

    /// What to do with negative initial draws.
    #[serde(default)]
    pub negative_counts: NegativeCountPolicy,

    /// Run scenarios on a thread pool.
    #[serde(default)]
    pub parallel: bool,

    /// Directory of the file this experiment was loaded from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

fn default_steps() -> usize {
    500
}

/// Metadata for an experiment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Machine identifier for this experiment.
    pub name: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,

    /// What this experiment produces.
    #[serde(default)]
    pub description: Option<String>,
}

/// Cubic container settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerSettings {
    /// Edge length of the cube
    pub size: f64,
    pub reaction_radius: f64,
    /// Temperature of the Boltzmann velocity distribution
    pub temperature: f64,
    pub mean_free_time: f64,
    /// Step length
    pub dt: f64,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            size: 50.0,
            reaction_radius: 4.0,
            temperature: 293.15,
            mean_free_time: 2.0,
            dt: 0.01,
        }
    }
}

impl ContainerSettings {
    pub fn config(&self) -> ContainerConfig {
        ContainerConfig::new(self.size, self.size, self.size, self.reaction_radius)
            .with_mean_free_time(self.mean_free_time)
    }

    pub fn validate(&self) -> Result<()> {
        self.config().validate()?;
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(DatasetError::InvalidExperiment(format!(
                "container.temperature must be positive, got {}",
                self.temperature
            )));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(DatasetError::InvalidExperiment(format!(
                "container.dt must be positive, got {}",
                self.dt
            )));
        }
        Ok(())
    }
}

fn default_naming_seed() -> u64 {
    42
}

/// Output file naming scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Naming {
    /// `{prefix}.tsv`, single-run experiments only
    Fixed,
    /// `{prefix}{run_seed}.tsv`
    #[default]
    Seeded,
    /// `{prefix}{perm[i]}.tsv` with `perm` a seeded shuffle of `1..=runs`
    Permuted {
        #[serde(default = "default_naming_seed")]
        seed: u64,
    },
}

/// Output location settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory receiving the series files
    pub directory: PathBuf,
    /// File name prefix
    pub prefix: String,
    /// Write relative abundances instead of raw counts
    pub relative: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: "run".to_string(),
            relative: false,
        }
    }
}

impl Experiment {
    /// Create an empty experiment with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ExperimentMetadata {
                name: name.into(),
                title: None,
                description: None,
            },
            reactions: None,
            container: ContainerSettings::default(),
            steps: default_steps(),
            seed: 0,
            baseline: IndexMap::new(),
            optional: IndexMap::new(),
            tracked: Vec::new(),
            scenarios: ScenarioPlan::default(),
            naming: Naming::default(),
            output: OutputSettings::default(),
            negative_counts: NegativeCountPolicy::default(),
            parallel: false,
            base_dir: None,
        }
    }

    /// Load an experiment from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        let mut experiment = Self::from_yaml(&content)?;
        experiment.base_dir = path.parent().map(Path::to_path_buf);
        Ok(experiment)
    }

    /// Parse an experiment from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let experiment: Experiment = serde_yaml::from_str(yaml)?;
        experiment.validate_schema()?;
        Ok(experiment)
    }

    /// Validate the experiment schema (API version, kind).
    fn validate_schema(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(DatasetError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(DatasetError::InvalidKind(self.kind.clone()));
        }
        if self.metadata.name.is_empty() {
            return Err(DatasetError::MissingField("metadata.name".to_string()));
        }
        Ok(())
    }

    /// Validate the experiment contents.
    ///
    /// This checks:
    /// - The schema fields
    /// - Container settings and step count
    /// - Means are finite and non-negative
    /// - Baseline and optional species are disjoint
    /// - The scenario plan fits the optional species
    /// - Tracked species are unique
    pub fn validate(&self) -> Result<()> {
        self.validate_schema()?;
        self.container.validate()?;
        if self.steps == 0 {
            return Err(invalid("steps must be at least 1"));
        }

        for (name, mean) in self.baseline.iter().chain(&self.optional) {
            if name.is_empty() {
                return Err(invalid("species names must not be empty"));
            }
            if !(mean.is_finite() && *mean >= 0.0) {
                return Err(invalid(format!(
                    "mean for {} must be finite and non-negative, got {}",
                    name, mean
                )));
            }
        }
        if let Some(name) = self.optional.keys().find(|n| self.baseline.contains_key(*n)) {
            return Err(invalid(format!(
                "{} is listed as both baseline and optional",
                name
            )));
        }

        if self.optional.len() > MAX_OPTIONAL {
            return Err(invalid(format!(
                "{} optional species exceed the limit of {}",
                self.optional.len(),
                MAX_OPTIONAL
            )));
        }
        match self.scenarios {
            ScenarioPlan::Subsets { active } if active > self.optional.len() => {
                return Err(invalid(format!(
                    "scenarios.active is {} but only {} optional species are listed",
                    active,
                    self.optional.len()
                )));
            }
            ScenarioPlan::Repeat { runs: 0 } => {
                return Err(invalid("scenarios.runs must be at least 1"));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        if let Some(name) = self.tracked.iter().find(|n| !seen.insert(*n)) {
            return Err(invalid(format!("{} is tracked twice", name)));
        }
        if self.output.prefix.contains(std::path::is_separator) {
            return Err(invalid("output.prefix must not contain path separators"));
        }
        Ok(())
    }

    /// Species that the catalog never mentions.
    ///
    /// Such species are legal but inert: they are seeded and recorded, and
    /// never react.
    pub fn unknown_species(&self, catalog: &ReactionCatalog) -> Vec<Species> {
        let mut names: Vec<&String> = self.baseline.keys().chain(self.optional.keys()).collect();
        names.extend(&self.tracked);
        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter(|n| seen.insert(*n))
            .map(|n| Species::from(n.as_str()))
            .filter(|s| !catalog.contains_species(s))
            .collect()
    }

    /// Baseline species and means, in file order.
    pub fn baseline_species(&self) -> Vec<(Species, f64)> {
        self.baseline
            .iter()
            .map(|(name, mean)| (Species::from(name.as_str()), *mean))
            .collect()
    }

    /// Optional species and means, in bit order.
    pub fn optional_species(&self) -> Vec<(Species, f64)> {
        self.optional
            .iter()
            .map(|(name, mean)| (Species::from(name.as_str()), *mean))
            .collect()
    }

    /// Output row order.
    pub fn tracked_species(&self) -> Vec<Species> {
        if self.tracked.is_empty() {
            self.baseline
                .keys()
                .chain(self.optional.keys())
                .map(|name| Species::from(name.as_str()))
                .collect()
        } else {
            self.tracked
                .iter()
                .map(|name| Species::from(name.as_str()))
                .collect()
        }
    }

    /// Reaction description path, resolved against the experiment file.
    pub fn reactions_path(&self) -> Option<PathBuf> {
        let path = self.reactions.as_ref()?;
        match &self.base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path.clone()),
        }
    }

    /// Step length.
    pub fn dt(&self) -> Dt {
        Dt(self.container.dt)
    }

    /// Factory for the particle-container engine these settings describe.
    pub fn container_factory(&self) -> ContainerFactory {
        ContainerFactory::new(self.container.config(), self.container.temperature)
    }

    /// Builder method: set the reaction description path.
    pub fn with_reactions(mut self, path: impl Into<PathBuf>) -> Self {
        self.reactions = Some(path.into());
        self
    }

    /// Builder method: set the container settings.
    pub fn with_container(mut self, container: ContainerSettings) -> Self {
        self.container = container;
        self
    }

    /// Builder method: set the step count.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Builder method: set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method: add a baseline species.
    pub fn with_baseline(mut self, species: impl Into<String>, mean: f64) -> Self {
        self.baseline.insert(species.into(), mean);
        self
    }

    /// Builder method: add an optional species.
    pub fn with_optional(mut self, species: impl Into<String>, mean: f64) -> Self {
        self.optional.insert(species.into(), mean);
        self
    }

    /// Builder method: set the tracked species order.
    pub fn with_tracked<I, S>(mut self, species: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracked = species.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: set the scenario plan.
    pub fn with_scenarios(mut self, plan: ScenarioPlan) -> Self {
        self.scenarios = plan;
        self
    }

    /// Builder method: set the naming scheme.
    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    /// Builder method: set the output directory and prefix.
    pub fn with_output(mut self, directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        self.output.directory = directory.into();
        self.output.prefix = prefix.into();
        self
    }

    /// Builder method: write relative abundances.
    pub fn with_relative(mut self, relative: bool) -> Self {
        self.output.relative = relative;
        self
    }

    /// Builder method: set the negative-count policy.
    pub fn with_negative_counts(mut self, policy: NegativeCountPolicy) -> Self {
        self.negative_counts = policy;
        self
    }

    /// Builder method: run scenarios in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder method: set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }
}

fn invalid(message: impl Into<String>) -> DatasetError {
    DatasetError::InvalidExperiment(message.into())
}
