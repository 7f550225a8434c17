//! Dataset writer
//!
//! Plain tab-separated text, no header rows. A series file has one line per
//! species (`name \t v0 \t v1 ...`), a graph file one line per edge
//! (`source \t target`).

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use lagchem_runtime::Species;

use crate::error::{DatasetError, Result};
use crate::graph::CausalGraph;
use crate::series::TimeSeries;

/// Render a series as TSV text.
///
/// Values use their `Display` form: integers as written, floats in the
/// shortest form that parses back to the same value.
pub fn format_series<T: Display>(series: &TimeSeries<T>) -> String {
    let mut out = String::new();
    for (species, values) in series.iter() {
        out.push_str(species.as_str());
        for value in values {
            out.push('\t');
            out.push_str(&value.to_string());
        }
        out.push('\n');
    }
    out
}

/// Render a graph as TSV text.
pub fn format_graph(graph: &CausalGraph) -> String {
    let mut out = String::new();
    for (source, target) in graph.node_pairs() {
        out.push_str(&source);
        out.push('\t');
        out.push_str(&target);
        out.push('\n');
    }
    out
}

/// Write a series to `path`, creating parent directories.
pub fn write_series<T: Display>(path: &Path, series: &TimeSeries<T>) -> Result<()> {
    write_text(path, &format_series(series))?;
    debug!(
        path = %path.display(),
        species = series.species().len(),
        steps = series.steps(),
        "series written"
    );
    Ok(())
}

/// Write a graph to `path`, creating parent directories.
pub fn write_graph(path: &Path, graph: &CausalGraph) -> Result<()> {
    write_text(path, &format_graph(graph))?;
    debug!(path = %path.display(), edges = graph.len(), "graph written");
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DatasetError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut out = BufWriter::new(file);
    out.write_all(text.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| DatasetError::io(path, e))
}

/// Parse series text produced by [`format_series`].
pub fn parse_series<T>(text: &str) -> Result<TimeSeries<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut species = Vec::new();
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let name = fields.next().unwrap_or_default();
        if name.is_empty() {
            return Err(DatasetError::MalformedSeries {
                line: i + 1,
                message: "missing species name".to_string(),
            });
        }
        let row = fields
            .map(|field| {
                field.parse::<T>().map_err(|e| DatasetError::MalformedSeries {
                    line: i + 1,
                    message: format!("bad value '{}': {}", field, e),
                })
            })
            .collect::<Result<Vec<T>>>()?;
        species.push(Species::from(name));
        rows.push(row);
    }
    TimeSeries::new(species, rows)
}

/// Read a series file written by [`write_series`].
pub fn read_series<T>(path: &Path) -> Result<TimeSeries<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    parse_series(&text)
}
