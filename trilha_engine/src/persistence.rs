//! Save document serialization with schema versioning.
//!
//! The whole progression state is stored as one JSON blob under a well-known
//! key. Loading never fails: a missing, unreadable, corrupted or incompatible
//! document is replaced with fresh defaults. Compatible documents are merged
//! over a default document so fields added by newer schemas are always present.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::progression::{ProgressError, ProgressionState};
use crate::storage::KeyValueStore;

/// Current save schema. Only the major component decides compatibility.
pub const SCHEMA_VERSION: &str = "1.2.0";
/// Storage key the save document lives under.
pub const SAVE_KEY: &str = "trilha-save";

/// Versioned, persisted form of the progression store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub schema_version: String,
    pub progression: ProgressionState,
    pub created_at: String,
    pub modified_at: String,
}

impl SaveDocument {
    /// A brand new document with default progression and current timestamps.
    pub fn fresh() -> Self {
        let now = timestamp();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            progression: ProgressionState::default(),
            created_at: now.clone(),
            modified_at: now,
        }
    }

    /// Update the modification timestamp.
    pub fn touch(&mut self) {
        self.modified_at = timestamp();
    }
}

impl Default for SaveDocument {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Reads and writes the save document through a key-value backend.
#[derive(Debug)]
pub struct Persistence {
    storage: Box<dyn KeyValueStore>,
    key: String,
}

impl Persistence {
    pub fn new(storage: impl KeyValueStore + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            key: SAVE_KEY.to_string(),
        }
    }

    /// Use a different storage key (one per profile, for example).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored document, or fresh defaults if there is nothing usable.
    pub fn load(&self) -> SaveDocument {
        match self.storage.get(&self.key) {
            Ok(None) => {
                info!("no save document under '{}'; starting fresh", self.key);
                SaveDocument::fresh()
            },
            Ok(Some(raw)) => match decode(&raw) {
                Ok(doc) => {
                    info!(
                        "save document '{}' loaded (created {}, modified {})",
                        self.key, doc.created_at, doc.modified_at
                    );
                    doc
                },
                Err(err) => {
                    warn!("discarding save document '{}': {err}", self.key);
                    SaveDocument::fresh()
                },
            },
            Err(err) => {
                warn!("could not read save document '{}': {err}", self.key);
                SaveDocument::fresh()
            },
        }
    }

    /// Serialize and write the document.
    ///
    /// # Errors
    /// Returns `StorageWriteFailed` if serialization or the backend write fails.
    pub fn save(&mut self, doc: &SaveDocument) -> Result<(), ProgressError> {
        let raw = serde_json::to_string(doc).map_err(|err| ProgressError::StorageWriteFailed(err.to_string()))?;
        self.storage
            .set(&self.key, &raw)
            .map_err(|err| ProgressError::StorageWriteFailed(err.to_string()))
    }

    /// Remove the stored document.
    ///
    /// # Errors
    /// Returns `StorageWriteFailed` if the backend refuses the removal.
    pub fn clear(&mut self) -> Result<(), ProgressError> {
        self.storage
            .remove(&self.key)
            .map_err(|err| ProgressError::StorageWriteFailed(err.to_string()))
    }
}

/// Render a document as portable text for backup.
///
/// # Errors
/// Returns `Corrupted` if the document cannot be serialized.
pub fn export_as_text(doc: &SaveDocument) -> Result<String, ProgressError> {
    serde_json::to_string_pretty(doc).map_err(|err| ProgressError::Corrupted(err.to_string()))
}

/// Decode text produced by [`export_as_text`] (or read from storage).
///
/// Applies the same compatibility check and default merge as loading.
///
/// # Errors
/// - `Corrupted` if the text is not a JSON document of the expected shape.
/// - `IncompatibleSchemaVersion` if the major schema version differs.
pub fn decode(text: &str) -> Result<SaveDocument, ProgressError> {
    let loaded: Value = serde_json::from_str(text).map_err(|err| ProgressError::Corrupted(err.to_string()))?;
    let version = loaded
        .get("schema_version")
        .and_then(Value::as_str)
        .ok_or_else(|| ProgressError::Corrupted("missing schema_version".to_string()))?
        .to_string();
    if !is_compatible(&version) {
        return Err(ProgressError::IncompatibleSchemaVersion {
            found: version,
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    let mut merged =
        serde_json::to_value(SaveDocument::fresh()).map_err(|err| ProgressError::Corrupted(err.to_string()))?;
    merge_defaults(&mut merged, loaded);

    let mut doc: SaveDocument =
        serde_json::from_value(merged).map_err(|err| ProgressError::Corrupted(err.to_string()))?;
    if version != SCHEMA_VERSION {
        info!("upgrading save document from schema {version} to {SCHEMA_VERSION}");
        doc.schema_version = SCHEMA_VERSION.to_string();
    }
    Ok(doc)
}

/// Recursively overlay `loaded` onto `defaults`.
///
/// Objects merge key by key, so keys missing from `loaded` keep their default
/// sub-structure. Any other present value replaces the default, except `null`,
/// which keeps it. Keys unknown to the defaults are carried along.
pub fn merge_defaults(defaults: &mut Value, loaded: Value) {
    match (defaults, loaded) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_defaults(slot, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (_, Value::Null) => {},
        (slot, value) => *slot = value,
    }
}

/// Major component of a `major.minor.patch` version string.
pub fn schema_major(version: &str) -> Option<u64> {
    version.trim().split('.').next()?.parse().ok()
}

/// True if `version` shares the current schema's major component.
pub fn is_compatible(version: &str) -> bool {
    match (schema_major(version), schema_major(SCHEMA_VERSION)) {
        (Some(found), Some(current)) => found == current,
        _ => false,
    }
}

/// Current UTC time as RFC 3339 text.
pub fn timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|err| {
        warn!("failed to format timestamp: {err}");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn merge_fills_missing_nested_keys() {
        let mut base = json!({"a": 1, "nested": {"x": true, "y": "default"}, "list": [1, 2]});
        merge_defaults(&mut base, json!({"nested": {"y": "loaded"}, "list": [9], "extra": 3}));
        assert_eq!(
            base,
            json!({"a": 1, "nested": {"x": true, "y": "loaded"}, "list": [9], "extra": 3})
        );
    }

    #[test]
    fn merge_keeps_default_for_null() {
        let mut base = json!({"a": {"b": 1}});
        merge_defaults(&mut base, json!({"a": null}));
        assert_eq!(base, json!({"a": {"b": 1}}));
    }

    #[test]
    fn schema_major_compatibility() {
        assert_eq!(schema_major("1.0.3"), Some(1));
        assert_eq!(schema_major("2"), Some(2));
        assert_eq!(schema_major("v1"), None);
        assert!(is_compatible("1.0.0"));
        assert!(!is_compatible("2.0.0"));
        assert!(!is_compatible("garbage"));
    }

    #[test]
    fn decode_older_minor_version_fills_new_fields() {
        let stored = json!({
            "schema_version": "1.0.0",
            "created_at": "2024-03-01T10:00:00Z",
            "progression": {"points": 120, "completed_missions": ["phishing"]}
        });
        let doc = decode(&stored.to_string()).unwrap();
        assert_eq!(doc.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.created_at, "2024-03-01T10:00:00Z");
        assert_eq!(doc.progression.points, 120);
        assert!(doc.progression.completed_missions.contains("phishing"));
        assert!(doc.progression.badges.is_empty());
        assert_eq!(doc.progression.settings, ProgressionState::default().settings);
    }

    #[test]
    fn decode_rejects_other_major_and_garbage() {
        let future = json!({"schema_version": "2.0.0", "progression": {"points": 5}});
        assert!(matches!(
            decode(&future.to_string()),
            Err(ProgressError::IncompatibleSchemaVersion { .. })
        ));
        assert!(matches!(decode("not json"), Err(ProgressError::Corrupted(_))));
        assert!(matches!(decode("{}"), Err(ProgressError::Corrupted(_))));

        let wrong_shape = json!({"schema_version": "1.0.0", "progression": {"points": "many"}});
        assert!(matches!(
            decode(&wrong_shape.to_string()),
            Err(ProgressError::Corrupted(_))
        ));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let empty = Persistence::new(MemoryStore::new());
        assert_eq!(empty.load().progression, ProgressionState::default());

        let corrupt = Persistence::new(MemoryStore::new().with_value(SAVE_KEY, "{{{"));
        assert_eq!(corrupt.load().progression, ProgressionState::default());

        let future = json!({"schema_version": "9.0.0", "progression": {"points": 900}});
        let incompatible = Persistence::new(MemoryStore::new().with_value(SAVE_KEY, &future.to_string()));
        assert_eq!(incompatible.load().progression.points, 0);
    }

    #[test]
    fn save_then_load_through_file_store() -> Result<()> {
        let dir = tempdir()?;
        let mut persistence = Persistence::new(FileStore::new(dir.path())).with_key("profile one");
        let mut doc = SaveDocument::fresh();
        doc.progression.points = 42;
        doc.progression.badges.insert("first-steps".into());
        persistence.save(&doc)?;

        let reopened = Persistence::new(FileStore::new(dir.path())).with_key("profile one");
        assert_eq!(reopened.load(), doc);

        persistence.clear()?;
        assert_eq!(reopened.load().progression.points, 0);
        Ok(())
    }

    #[test]
    fn save_reports_write_failure() {
        let mut persistence = Persistence::new(MemoryStore::read_only());
        let err = persistence.save(&SaveDocument::fresh()).unwrap_err();
        assert!(matches!(err, ProgressError::StorageWriteFailed(_)));
    }

    #[test]
    fn export_then_decode_round_trips() {
        let mut doc = SaveDocument::fresh();
        doc.progression.points = 310;
        doc.progression.completed_missions.insert("senhas".into());
        let text = export_as_text(&doc).unwrap();
        assert_eq!(decode(&text).unwrap(), doc);
    }
}
