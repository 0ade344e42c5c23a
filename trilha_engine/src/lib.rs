#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const TRILHA_VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod data_paths;
pub mod dialogue;
pub mod dispatch;
pub mod levels;
pub mod loader;
pub mod persistence;
pub mod progression;
pub mod script;
pub mod storage;

// Terminal host
pub mod command;
pub mod repl;
pub mod style;
pub mod view;

// Re-exports for convenience
pub use dialogue::{DialogueContext, DialogueController, DialogueError, DialogueRenderer, Progress, SessionState};
pub use dispatch::{MissionFlow, NoMissionFlow};
pub use levels::LevelTable;
pub use loader::{GameContent, load_content};
pub use persistence::{Persistence, SaveDocument};
pub use progression::{PointsAwarded, ProgressError, ProgressionState, ProgressionStore, SaveStatus};
pub use repl::run_repl;
pub use script::{ScriptRepository, SessionHistory};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
