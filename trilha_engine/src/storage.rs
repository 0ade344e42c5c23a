//! Durable key-value storage backends for save documents.
//!
//! The progression store only needs to read and write one opaque text blob
//! under a well-known key. [`FileStore`] keeps each key in its own file;
//! [`MemoryStore`] keeps everything in memory and can simulate a storage
//! backend that refuses writes.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

pub const SAVE_DIR: &str = "saved_games";
const APP_DIR: &str = "trilha";

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is disabled")]
    Disabled,
    #[error("i/o error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Minimal persistent key-value store.
pub trait KeyValueStore: std::fmt::Debug {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the backend refuses or fails the write.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the backend fails the removal.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<sanitized key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File store rooted in the platform data directory, or `./saved_games`.
    pub fn in_default_location() -> Self {
        Self::new(default_save_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let io_err = |source: io::Error| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;

        // write to a sibling file first so a failed write never truncates the old save
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(io_err)?;
        fs::rename(&staging, &path).map_err(io_err)?;
        info!("wrote {} bytes to '{}'", value.len(), path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store, used for tests and when no durable storage is available.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    reject_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail with [`StorageError::Disabled`].
    pub fn read_only() -> Self {
        Self {
            values: HashMap::new(),
            reject_writes: true,
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn set_reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Disabled);
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Disabled);
        }
        self.values.remove(key);
        Ok(())
    }
}

/// Platform data directory for saves, falling back to a local folder.
pub fn default_save_dir() -> PathBuf {
    match dirs::data_dir().or_else(dirs::data_local_dir) {
        Some(base) => base.join(APP_DIR),
        None => {
            warn!("no platform data directory available; saving under ./{SAVE_DIR}");
            PathBuf::from(SAVE_DIR)
        },
    }
}

/// Normalize a storage key into a filesystem-safe file stem.
pub fn sanitize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut slug = String::new();
    let mut pending_dash = false;
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else if ch == '-' || ch == '_' {
            if !slug.is_empty() {
                slug.push(ch);
            }
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    let trimmed = slug.trim_matches(&['-', '_'][..]).to_string();
    if trimmed.is_empty() { "save".to_string() } else { trimmed }
}
