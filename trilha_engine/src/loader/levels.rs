//! Level table loader.
//!
//! Levels are authored in `levels.toml` as a list of `[[levels]]` tables with
//! a name, point threshold and short description. Loading never fails: any
//! problem with the file falls back to the built-in table.

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use trilha_data::LevelDef;

use crate::levels::LevelTable;

/// Wrapper for the TOML file containing level definitions.
#[derive(Debug, Deserialize)]
struct LevelsFile {
    levels: Vec<LevelDef>,
}

/// Loads the level table from a TOML file, falling back to defaults on error.
///
/// # Logging
/// - `info!` on successful load
/// - `warn!` if the file cannot be read, parsed or validated (with fallback to defaults)
pub fn load_levels(toml_path: &Path) -> LevelTable {
    match try_load_levels(toml_path) {
        Ok(table) => {
            info!("{} levels loaded from '{}'", table.len(), toml_path.display());
            table
        },
        Err(e) => {
            warn!(
                "Could not load level data from '{}': {e:#}. Using built-in defaults.",
                toml_path.display()
            );
            LevelTable::default()
        },
    }
}

/// Parses a level table from TOML source.
///
/// # Errors
/// Returns an error if the source is not valid TOML or the levels break table invariants.
pub fn parse_levels(source: &str) -> Result<LevelTable> {
    let wrapper: LevelsFile = toml::from_str(source).context("parsing level table")?;
    LevelTable::new(wrapper.levels).map_err(|errors| {
        let details = errors
            .into_iter()
            .map(|err| format!("- {err}"))
            .collect::<Vec<_>>()
            .join("\n");
        anyhow!("level table validation failed:\n{details}")
    })
}

fn try_load_levels(toml_path: &Path) -> Result<LevelTable> {
    let source = fs::read_to_string(toml_path)
        .with_context(|| format!("reading level data from '{}'", toml_path.display()))?;
    parse_levels(&source).with_context(|| format!("loading '{}'", toml_path.display()))
}
