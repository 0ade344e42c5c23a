//! Loader utilities for the runtime content of the game.
//!
//! Dialogue scripts are loaded from JSON and the level table from TOML, both
//! resolved relative to the data root.

pub mod dialogue;
pub mod levels;

use crate::data_paths::data_path;
use crate::levels::LevelTable;
use crate::loader::dialogue::load_dialogue;
use crate::loader::levels::load_levels;
use crate::script::ScriptRepository;

use anyhow::{Context, Result};
use log::info;

/// Everything the engine reads from the data directory at startup.
#[derive(Debug, Clone)]
pub struct GameContent {
    pub levels: LevelTable,
    pub scripts: ScriptRepository,
}

/// Load the level table and dialogue catalog from the data root.
///
/// # Errors
/// Errors bubble up from reading or validating the dialogue catalog. A bad
/// level table never fails the load; the built-in levels are used instead.
pub fn load_content() -> Result<GameContent> {
    let levels = load_levels(&data_path("levels.toml"));
    let dialogue = load_dialogue(&data_path("dialogue.json")).context("while loading dialogue catalog")?;
    let scripts = ScriptRepository::from_def(dialogue);
    info!(
        "content loaded: {} levels, {} NPCs with dialogue",
        levels.len(),
        scripts.npc_count()
    );
    Ok(GameContent { levels, scripts })
}
