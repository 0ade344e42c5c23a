#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Trilha **
//! Terminal host for the dialogue and progression engine.

use trilha_engine::style::GameStyle;
use trilha_engine::{DialogueController, FileStore, Persistence, ProgressionStore, TRILHA_VERSION, load_content, run_repl};

use anyhow::{Context, Result};
use colored::Colorize;

use log::info;

fn main() -> Result<()> {
    env_logger::init();
    info!("Start: loading Trilha content...");
    let content = load_content().context("while loading game content")?;
    info!("content loaded successfully.");

    let storage = FileStore::in_default_location();
    info!("progress is saved under '{}'", storage.dir().display());
    let mut store = ProgressionStore::open(content.levels, Persistence::new(storage));
    let mut controller = DialogueController::new(content.scripts);

    println!(
        "{:^72}",
        format!("TRILHA v{TRILHA_VERSION}").bright_yellow().underline()
    );
    println!(
        "\nWelcome back! You are {} with {} points.",
        store.level().name.level_style(),
        store.points().to_string().points_style()
    );
    println!(
        "{}\n",
        "Type `npcs` to see who is around, `talk <npc>` to start, `help` for everything else.".hint_style()
    );

    run_repl(&mut controller, &mut store)
}
