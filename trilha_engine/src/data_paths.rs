//! Locating the runtime content directory (`levels.toml`, `dialogue.json`).
//!
//! `TRILHA_DATA_DIR` wins when it names a directory. Otherwise the first
//! existing candidate from [`candidate_roots`] is used, resolved once per process.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{info, warn};

/// Environment variable that overrides data directory detection.
pub const DATA_DIR_ENV: &str = "TRILHA_DATA_DIR";
/// Content directory name inside the workspace.
const CRATE_DATA_DIR: &str = "trilha_engine/data";

static DATA_ROOT: LazyLock<PathBuf> = LazyLock::new(|| {
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let root = resolve_data_root(env::var_os(DATA_DIR_ENV).map(PathBuf::from), exe_dir.as_deref());
    info!("content directory: '{}'", root.display());
    root
});

/// Construct a path relative to the resolved content directory.
pub fn data_path(relative: impl AsRef<Path>) -> PathBuf {
    DATA_ROOT.join(relative)
}

/// Pick the content directory from an optional override and the executable's directory.
pub fn resolve_data_root(override_dir: Option<PathBuf>, exe_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        if dir.is_dir() {
            return dir;
        }
        warn!("{DATA_DIR_ENV} points at '{}', which is not a directory", dir.display());
    }
    candidate_roots(exe_dir)
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| PathBuf::from(CRATE_DATA_DIR))
}

/// Places content is looked for, most specific first.
///
/// Covers running from the workspace root, from the crate directory, and a
/// binary shipped next to its `data/` folder or one level below it.
pub fn candidate_roots(exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CRATE_DATA_DIR), PathBuf::from("data")];
    for base in exe_dir.into_iter().flat_map(Path::ancestors).take(2) {
        candidates.push(base.join(CRATE_DATA_DIR));
        candidates.push(base.join("data"));
    }
    candidates
}
