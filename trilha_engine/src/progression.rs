//! Player progression: points, derived level, missions, badges and settings.
//!
//! A single [`ProgressionStore`] is created at startup and handed to every
//! consumer by reference. Every mutation recomputes derived state before it
//! returns and then persists the save document. A failed write leaves the
//! store running in memory; the failure is reported through [`SaveStatus`].

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use trilha_data::LevelDef;

use crate::levels::LevelTable;
use crate::persistence::{self, Persistence, SaveDocument};
use crate::storage::MemoryStore;

pub const SETTING_SOUND: &str = "sound_enabled";
pub const SETTING_MUSIC_VOLUME: &str = "music_volume";
pub const SETTING_TEXT_SPEED: &str = "text_speed";

/// Recoverable progression and persistence failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressError {
    #[error("invalid point amount {0}: must be a positive integer")]
    InvalidAmount(i64),
    #[error("failed to write save document: {0}")]
    StorageWriteFailed(String),
    #[error("save schema {found} is incompatible with current schema {expected}")]
    IncompatibleSchemaVersion { found: String, expected: String },
    #[error("save document is corrupted: {0}")]
    Corrupted(String),
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),
}

/// Persisted progression fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub points: u64,
    /// Index into the level table; always derived from `points`.
    pub level_rank: usize,
    pub completed_missions: BTreeSet<String>,
    pub badges: BTreeSet<String>,
    pub settings: BTreeMap<String, Value>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            points: 0,
            level_rank: 0,
            completed_missions: BTreeSet::new(),
            badges: BTreeSet::new(),
            settings: default_settings(),
        }
    }
}

/// Settings every save document carries, with their default values.
pub fn default_settings() -> BTreeMap<String, Value> {
    BTreeMap::from([
        (SETTING_SOUND.to_string(), Value::Bool(true)),
        (SETTING_MUSIC_VOLUME.to_string(), Value::from(0.8)),
        (SETTING_TEXT_SPEED.to_string(), Value::from("normal")),
    ])
}

/// Result of a successful [`ProgressionStore::add_points`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsAwarded {
    pub points_added: u64,
    pub total: u64,
    pub level_changed: bool,
    pub new_level_name: String,
}

/// Whether the latest mutation reached durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Persisted,
    /// The last write failed; the store keeps working in memory.
    InMemoryOnly(String),
}

impl SaveStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SaveStatus::InMemoryOnly(_))
    }
}

/// Owner of the player's progression and its save document.
#[derive(Debug)]
pub struct ProgressionStore {
    document: SaveDocument,
    levels: LevelTable,
    persistence: Persistence,
    save_status: SaveStatus,
}

impl ProgressionStore {
    /// Load the saved document (or defaults) and derive the level from its points.
    pub fn open(levels: LevelTable, persistence: Persistence) -> Self {
        let mut document = persistence.load();
        sync_rank(&mut document.progression, &levels);
        info!(
            "progression ready: {} points, level '{}'",
            document.progression.points,
            levels.level(document.progression.level_rank).name
        );
        Self {
            document,
            levels,
            persistence,
            save_status: SaveStatus::Persisted,
        }
    }

    /// A store backed only by memory.
    pub fn in_memory(levels: LevelTable) -> Self {
        Self::open(levels, Persistence::new(MemoryStore::new()))
    }

    /// Add a positive number of points and recompute the level.
    ///
    /// # Errors
    /// Returns `InvalidAmount` if `amount` is zero or negative; state is unchanged.
    pub fn add_points(&mut self, amount: i64) -> Result<PointsAwarded, ProgressError> {
        let Some(points) = u64::try_from(amount).ok().filter(|n| *n > 0) else {
            warn!("rejected point award of {amount}");
            return Err(ProgressError::InvalidAmount(amount));
        };

        let progression = &mut self.document.progression;
        let old_rank = progression.level_rank;
        progression.points = progression.points.saturating_add(points);
        progression.level_rank = self.levels.rank_for(progression.points);

        let awarded = PointsAwarded {
            points_added: points,
            total: progression.points,
            level_changed: progression.level_rank != old_rank,
            new_level_name: self.levels.level(progression.level_rank).name.clone(),
        };
        info!(
            "awarded {points} points (total {}), level '{}'{}",
            awarded.total,
            awarded.new_level_name,
            if awarded.level_changed { " [level up]" } else { "" }
        );
        self.persist();
        Ok(awarded)
    }

    /// Record a mission as completed. Returns `false` if it already was.
    pub fn complete_mission(&mut self, mission_id: &str) -> bool {
        if !self.document.progression.completed_missions.insert(mission_id.to_string()) {
            return false;
        }
        info!("mission '{mission_id}' completed");
        self.persist();
        true
    }

    /// Award a badge. Returns `false` if the player already has it.
    pub fn add_badge(&mut self, badge_id: &str) -> bool {
        if !self.document.progression.badges.insert(badge_id.to_string()) {
            return false;
        }
        info!("badge '{badge_id}' awarded");
        self.persist();
        true
    }

    pub fn is_mission_completed(&self, mission_id: &str) -> bool {
        self.document.progression.completed_missions.contains(mission_id)
    }

    pub fn has_badge(&self, badge_id: &str) -> bool {
        self.document.progression.badges.contains(badge_id)
    }

    /// Advancement toward the next level in `[0, 1]`; `1.0` at the top level.
    pub fn progress(&self) -> f64 {
        self.levels.progress(self.document.progression.points)
    }

    pub fn points(&self) -> u64 {
        self.document.progression.points
    }

    pub fn level_rank(&self) -> usize {
        self.document.progression.level_rank
    }

    pub fn level(&self) -> &LevelDef {
        self.levels.level(self.document.progression.level_rank)
    }

    pub fn next_level(&self) -> Option<&LevelDef> {
        self.levels.next(self.document.progression.level_rank)
    }

    pub fn levels(&self) -> &LevelTable {
        &self.levels
    }

    pub fn state(&self) -> &ProgressionState {
        &self.document.progression
    }

    pub fn snapshot(&self) -> ProgressionState {
        self.document.progression.clone()
    }

    pub fn document(&self) -> &SaveDocument {
        &self.document
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.document.progression.settings.get(key)
    }

    /// Current text speed setting, `"normal"` if missing or not a string.
    pub fn text_speed(&self) -> &str {
        self.setting(SETTING_TEXT_SPEED)
            .and_then(Value::as_str)
            .unwrap_or("normal")
    }

    /// Change a known setting and persist it.
    ///
    /// # Errors
    /// Returns `UnknownSetting` for keys that have no default value.
    pub fn set_setting(&mut self, key: &str, value: Value) -> Result<(), ProgressError> {
        if !default_settings().contains_key(key) {
            return Err(ProgressError::UnknownSetting(key.to_string()));
        }
        let settings = &mut self.document.progression.settings;
        if settings.get(key) == Some(&value) {
            return Ok(());
        }
        info!("setting '{key}' changed to {value}");
        settings.insert(key.to_string(), value);
        self.persist();
        Ok(())
    }

    /// Start over with a fresh document.
    pub fn reset(&mut self) {
        info!("progression reset to defaults");
        self.document = SaveDocument::fresh();
        self.persist();
    }

    /// Export the full save document as portable text.
    ///
    /// # Errors
    /// Returns `Corrupted` if the document cannot be serialized.
    pub fn export_as_text(&self) -> Result<String, ProgressError> {
        persistence::export_as_text(&self.document)
    }

    /// Replace the current progression with an exported document.
    ///
    /// # Errors
    /// Returns `Corrupted` or `IncompatibleSchemaVersion`; state is unchanged on error.
    pub fn import_from_text(&mut self, text: &str) -> Result<(), ProgressError> {
        let mut document = persistence::decode(text).inspect_err(|err| warn!("import rejected: {err}"))?;
        sync_rank(&mut document.progression, &self.levels);
        info!(
            "imported save document with {} points and {} completed missions",
            document.progression.points,
            document.progression.completed_missions.len()
        );
        self.document = document;
        self.persist();
        Ok(())
    }

    fn persist(&mut self) {
        self.document.touch();
        match self.persistence.save(&self.document) {
            Ok(()) => {
                if self.save_status.is_degraded() {
                    info!("storage writes are succeeding again");
                }
                self.save_status = SaveStatus::Persisted;
            },
            Err(err) => {
                warn!("continuing in memory only: {err}");
                self.save_status = SaveStatus::InMemoryOnly(err.to_string());
            },
        }
    }
}

/// Re-derive the level rank from points, e.g. after loading or importing.
fn sync_rank(progression: &mut ProgressionState, levels: &LevelTable) {
    let rank = levels.rank_for(progression.points);
    if rank != progression.level_rank {
        info!(
            "stored level rank {} does not match {} points; using rank {rank}",
            progression.level_rank, progression.points
        );
        progression.level_rank = rank;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SAVE_KEY;
    use crate::storage::KeyValueStore;
    use serde_json::json;

    fn three_tiers() -> LevelTable {
        LevelTable::new(vec![
            LevelDef::new("Novato", 0, ""),
            LevelDef::new("Junior", 100, ""),
            LevelDef::new("Pleno", 300, ""),
        ])
        .unwrap()
    }

    #[test]
    fn add_points_scenario_from_novato_to_junior() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        assert_eq!(store.level().name, "Novato");

        let first = store.add_points(100).unwrap();
        assert_eq!(store.level_rank(), 1);
        assert!(first.level_changed);
        assert_eq!(first.new_level_name, "Junior");
        assert!(store.progress().abs() < f64::EPSILON);

        let second = store.add_points(150).unwrap();
        assert_eq!(second.total, 250);
        assert_eq!(store.level_rank(), 1);
        assert!(!second.level_changed);
        assert!((store.progress() - 0.75).abs() < f64::EPSILON);
        assert_eq!(store.next_level().map(|l| l.name.as_str()), Some("Pleno"));
    }

    #[test]
    fn level_rank_tracks_points_for_any_sequence() {
        let table = three_tiers();
        let mut store = ProgressionStore::in_memory(table.clone());
        let mut last_rank = 0;
        for amount in [1, 7, 50, 41, 1, 120, 79, 2, 500] {
            store.add_points(amount).unwrap();
            let expected = table
                .iter()
                .enumerate()
                .filter(|(_, level)| level.threshold <= store.points())
                .map(|(idx, _)| idx)
                .max()
                .unwrap();
            assert_eq!(store.level_rank(), expected);
            assert!(store.level_rank() >= last_rank);
            last_rank = store.level_rank();
        }
    }

    #[test]
    fn add_points_rejects_non_positive_amounts() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        assert_eq!(store.add_points(0), Err(ProgressError::InvalidAmount(0)));
        assert_eq!(store.add_points(-20), Err(ProgressError::InvalidAmount(-20)));
        assert_eq!(store.points(), 0);
    }

    #[test]
    fn missions_and_badges_are_idempotent() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        assert!(store.complete_mission("phishing"));
        assert!(!store.complete_mission("phishing"));
        assert_eq!(store.state().completed_missions.len(), 1);
        assert!(store.is_mission_completed("phishing"));
        assert!(!store.is_mission_completed("senhas"));

        assert!(store.add_badge("detetive"));
        assert!(!store.add_badge("detetive"));
        assert_eq!(store.state().badges.len(), 1);
        assert!(store.has_badge("detetive"));
    }

    #[test]
    fn write_failures_degrade_to_memory() {
        let mut store = ProgressionStore::open(three_tiers(), Persistence::new(MemoryStore::read_only()));
        let awarded = store.add_points(120).unwrap();
        assert!(awarded.level_changed);
        assert!(store.save_status().is_degraded());
        assert!(store.complete_mission("phishing"));
        assert_eq!(store.points(), 120);
    }

    #[test]
    fn open_recomputes_stale_level_rank() {
        let stored = json!({
            "schema_version": "1.0.0",
            "progression": {"points": 320, "level_rank": 0}
        });
        let storage = MemoryStore::new().with_value(SAVE_KEY, &stored.to_string());
        let store = ProgressionStore::open(three_tiers(), Persistence::new(storage));
        assert_eq!(store.level_rank(), 2);
        assert_eq!(store.level().name, "Pleno");
    }

    #[test]
    fn export_import_reproduces_state() {
        let mut source = ProgressionStore::in_memory(three_tiers());
        source.add_points(130).unwrap();
        source.complete_mission("phishing");
        source.add_badge("detetive");
        source.set_setting(SETTING_TEXT_SPEED, json!("fast")).unwrap();
        let text = source.export_as_text().unwrap();

        let mut target = ProgressionStore::in_memory(three_tiers());
        let before_import = target.snapshot();
        target.import_from_text(&text).unwrap();
        assert_eq!(before_import, ProgressionState::default());
        assert_eq!(target.snapshot(), source.snapshot());
        assert_eq!(target.text_speed(), "fast");
    }

    #[test]
    fn import_rejects_incompatible_text_without_changes() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        store.add_points(10).unwrap();
        let future = json!({"schema_version": "3.0.0", "progression": {"points": 999}}).to_string();
        assert!(matches!(
            store.import_from_text(&future),
            Err(ProgressError::IncompatibleSchemaVersion { .. })
        ));
        assert!(matches!(store.import_from_text("nope"), Err(ProgressError::Corrupted(_))));
        assert_eq!(store.points(), 10);
    }

    #[test]
    fn settings_accept_only_known_keys() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        assert_eq!(store.setting(SETTING_SOUND), Some(&json!(true)));
        store.set_setting(SETTING_SOUND, json!(false)).unwrap();
        assert_eq!(store.setting(SETTING_SOUND), Some(&json!(false)));
        assert_eq!(
            store.set_setting("difficulty", json!("hard")),
            Err(ProgressError::UnknownSetting("difficulty".into()))
        );
    }

    #[test]
    fn reset_restores_defaults_and_persists() {
        let mut store = ProgressionStore::in_memory(three_tiers());
        store.add_points(400).unwrap();
        store.reset();
        assert_eq!(store.state(), &ProgressionState::default());
        assert!(!store.save_status().is_degraded());
    }

    #[test]
    fn mutations_are_written_to_storage() {
        #[derive(Debug, Default)]
        struct Counting {
            inner: MemoryStore,
            writes: std::rc::Rc<std::cell::Cell<usize>>,
        }
        impl KeyValueStore for Counting {
            fn get(&self, key: &str) -> Result<Option<String>, crate::storage::StorageError> {
                self.inner.get(key)
            }
            fn set(&mut self, key: &str, value: &str) -> Result<(), crate::storage::StorageError> {
                self.writes.set(self.writes.get() + 1);
                self.inner.set(key, value)
            }
            fn remove(&mut self, key: &str) -> Result<(), crate::storage::StorageError> {
                self.inner.remove(key)
            }
        }

        let writes = std::rc::Rc::new(std::cell::Cell::new(0));
        let storage = Counting {
            inner: MemoryStore::new(),
            writes: writes.clone(),
        };
        let mut store = ProgressionStore::open(three_tiers(), Persistence::new(storage));
        store.add_points(5).unwrap();
        store.complete_mission("a");
        store.complete_mission("a");
        store.add_badge("b");
        let _ = store.add_points(-1);
        assert_eq!(writes.get(), 3);
    }
}
