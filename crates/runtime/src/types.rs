//! Core runtime types
//!
//! Identity and step types shared by the catalog, the engines and the
//! dataset layer.

use std::fmt;

/// Unique identifier for a chemical species
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Species(pub String);

impl Species {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Node name of this species one step in the past
    pub fn lag1(&self) -> String {
        format!("{}_lag1", self.0)
    }

    /// Node name of this species at the current step
    pub fn lag0(&self) -> String {
        format!("{}_lag0", self.0)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Species {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Species {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Time step for one engine advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dt(pub f64);

impl Dt {
    pub fn seconds(&self) -> f64 {
        self.0
    }
}

/// Three-component vector used for positions and velocities
pub type Vec3 = [f64; 3];
