//! lagchem Tools
//!
//! CLI tools for generating datasets and ground-truth graphs.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Default is `info`, with debug output from the tools themselves.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lagchem_tools=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Split a comma-separated species list, dropping empty entries.
pub fn parse_species_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
