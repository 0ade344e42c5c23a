//! Level table used to derive the player's rank from accumulated points.
//!
//! The table is ordered ascending by threshold and always starts at zero, so
//! every point total resolves to a level.

use trilha_data::{LevelDef, ValidationError, validate_levels};

/// Ordered progression tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    levels: Vec<LevelDef>,
}

impl LevelTable {
    /// Build a table from authored levels, sorting them by threshold.
    ///
    /// # Errors
    /// Returns every validation problem found when the levels cannot form a table.
    pub fn new(mut levels: Vec<LevelDef>) -> Result<Self, Vec<ValidationError>> {
        let errors = validate_levels(&levels);
        if !errors.is_empty() {
            return Err(errors);
        }
        levels.sort_by_key(|level| level.threshold);
        Ok(Self { levels })
    }

    /// Greatest index whose threshold does not exceed `points`.
    pub fn rank_for(&self, points: u64) -> usize {
        self.levels
            .iter()
            .rposition(|level| level.threshold <= points)
            .unwrap_or(0)
    }

    pub fn get(&self, rank: usize) -> Option<&LevelDef> {
        self.levels.get(rank)
    }

    /// Level for `rank`, clamped to the highest tier.
    pub fn level(&self, rank: usize) -> &LevelDef {
        let last = self.levels.len() - 1;
        &self.levels[rank.min(last)]
    }

    pub fn next(&self, rank: usize) -> Option<&LevelDef> {
        self.levels.get(rank + 1)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDef> {
        self.levels.iter()
    }

    /// Fraction of the way from the current level's threshold to the next one.
    ///
    /// Returns `1.0` once the highest level is reached.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self, points: u64) -> f64 {
        let rank = self.rank_for(points);
        let Some(next) = self.next(rank) else {
            return 1.0;
        };
        let floor = self.level(rank).threshold;
        let span = next.threshold.saturating_sub(floor);
        if span == 0 {
            return 1.0;
        }
        let gained = points.saturating_sub(floor);
        (gained as f64 / span as f64).clamp(0.0, 1.0)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

/// Built-in tiers used when `levels.toml` is missing or malformed.
pub fn default_levels() -> Vec<LevelDef> {
    vec![
        LevelDef::new("Novato", 0, "Primeiros passos na trilha."),
        LevelDef::new("Junior", 100, "Já reconhece os golpes mais comuns."),
        LevelDef::new("Pleno", 300, "Ajuda os colegas a se protegerem."),
        LevelDef::new("Sênior", 600, "Antecipa ameaças antes que aconteçam."),
        LevelDef::new("Especialista", 1000, "Referência em segurança digital."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_tiers() -> LevelTable {
        LevelTable::new(vec![
            LevelDef::new("Novato", 0, ""),
            LevelDef::new("Junior", 100, ""),
            LevelDef::new("Pleno", 300, ""),
        ])
        .unwrap()
    }

    #[test]
    fn default_levels_form_a_valid_table() {
        let table = LevelTable::new(default_levels()).unwrap();
        assert_eq!(table, LevelTable::default());
        assert_eq!(table.level(0).threshold, 0);
    }

    #[test]
    fn rank_is_greatest_threshold_not_above_points() {
        let table = three_tiers();
        assert_eq!(table.rank_for(0), 0);
        assert_eq!(table.rank_for(99), 0);
        assert_eq!(table.rank_for(100), 1);
        assert_eq!(table.rank_for(299), 1);
        assert_eq!(table.rank_for(300), 2);
        assert_eq!(table.rank_for(u64::MAX), 2);
    }

    #[test]
    fn new_sorts_unordered_levels() {
        let table = LevelTable::new(vec![
            LevelDef::new("Pleno", 300, ""),
            LevelDef::new("Novato", 0, ""),
            LevelDef::new("Junior", 100, ""),
        ])
        .unwrap();
        let names: Vec<_> = table.iter().map(|level| level.name.as_str()).collect();
        assert_eq!(names, ["Novato", "Junior", "Pleno"]);
    }

    #[test]
    fn new_rejects_tables_without_zero_threshold() {
        let errors = LevelTable::new(vec![LevelDef::new("Junior", 100, "")]).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn progress_between_tiers() {
        let table = three_tiers();
        assert!((table.progress(100) - 0.0).abs() < f64::EPSILON);
        assert!((table.progress(250) - 0.75).abs() < f64::EPSILON);
        assert!((table.progress(50) - 0.5).abs() < f64::EPSILON);
        assert!((table.progress(300) - 1.0).abs() < f64::EPSILON);
        assert!((table.progress(5_000) - 1.0).abs() < f64::EPSILON);
    }
}
