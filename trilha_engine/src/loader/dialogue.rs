//! Dialogue catalog loader.

use anyhow::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::Path;
use trilha_data::{DialogueDef, validate_dialogue};

/// Load and validate the dialogue catalog from a JSON file.
///
/// # Errors
/// Errors bubble up from file IO, deserialization, or validation.
pub fn load_dialogue(json_path: &Path) -> Result<DialogueDef> {
    let raw = fs::read_to_string(json_path)
        .with_context(|| format!("reading dialogue data from '{}'", json_path.display()))?;
    let def = parse_dialogue(&raw).with_context(|| format!("loading '{}'", json_path.display()))?;
    info!(
        "{} NPC dialogue sets loaded from '{}'",
        def.npcs.len(),
        json_path.display()
    );
    Ok(def)
}

/// Parse and validate a dialogue catalog from JSON source.
///
/// # Errors
/// Returns an error if the source does not deserialize or fails validation.
pub fn parse_dialogue(source: &str) -> Result<DialogueDef> {
    let def: DialogueDef = serde_json::from_str(source).context("parsing dialogue catalog")?;
    let errors = validate_dialogue(&def);
    if errors.is_empty() {
        return Ok(def);
    }
    let details = errors
        .into_iter()
        .map(|err| format!("- {err}"))
        .collect::<Vec<_>>()
        .join("\n");
    bail!("dialogue validation failed:\n{details}");
}
