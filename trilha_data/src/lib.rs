//! Shared data model for Trilha dialogue and progression content.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_dialogue, validate_levels};
