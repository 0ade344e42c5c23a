use std::collections::HashSet;
use std::fmt;

use crate::*;

/// Validation error for malformed content in a `DialogueDef` or level table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateId { kind: &'static str, id: String },
    Empty { kind: &'static str, context: String },
    InvalidValue { context: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateId { kind, id } => {
                write!(f, "duplicate {kind} id '{id}'")
            },
            ValidationError::Empty { kind, context } => {
                write!(f, "empty {kind} ({context})")
            },
            ValidationError::InvalidValue { context } => {
                write!(f, "invalid value ({context})")
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate ids and line references in a dialogue catalog.
///
/// ```
/// use trilha_data::{DialogueDef, DialogueLine, NpcDialogueDef, ScriptVariant, validate_dialogue};
///
/// let def = DialogueDef {
///     npcs: vec![NpcDialogueDef {
///         id: "ana".into(),
///         name: "Ana".into(),
///         mission_id: None,
///         variants: vec![ScriptVariant {
///             id: "intro".into(),
///             when: Vec::new(),
///             lines: vec![DialogueLine::say(Some("Ana"), "Oi!")],
///         }],
///     }],
/// };
/// assert!(validate_dialogue(&def).is_empty());
/// ```
pub fn validate_dialogue(def: &DialogueDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut npc_ids = HashSet::new();

    for npc in &def.npcs {
        if npc.id.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: "npc id is blank".to_string(),
            });
        }
        if !npc_ids.insert(npc.id.as_str()) {
            errors.push(ValidationError::DuplicateId {
                kind: "npc",
                id: npc.id.clone(),
            });
        }
        if npc.variants.is_empty() {
            errors.push(ValidationError::Empty {
                kind: "variant list",
                context: format!("npc '{}'", npc.id),
            });
        }

        let mut variant_ids = HashSet::new();
        for variant in &npc.variants {
            if !variant_ids.insert(variant.id.as_str()) {
                errors.push(ValidationError::DuplicateId {
                    kind: "variant",
                    id: format!("{}/{}", npc.id, variant.id),
                });
            }
            check_variant(&npc.id, variant, &mut errors);
        }
    }

    errors
}

/// Validate a level table: at least one tier, a zero-threshold tier, unique names and thresholds.
pub fn validate_levels(levels: &[LevelDef]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if levels.is_empty() {
        errors.push(ValidationError::Empty {
            kind: "level table",
            context: "no levels defined".to_string(),
        });
        return errors;
    }

    if !levels.iter().any(|level| level.threshold == 0) {
        errors.push(ValidationError::InvalidValue {
            context: "no level starts at threshold 0".to_string(),
        });
    }

    let mut names = HashSet::new();
    let mut thresholds = HashSet::new();
    for level in levels {
        if level.name.trim().is_empty() {
            errors.push(ValidationError::InvalidValue {
                context: format!("level at threshold {} has a blank name", level.threshold),
            });
        }
        if !names.insert(level.name.as_str()) {
            errors.push(ValidationError::DuplicateId {
                kind: "level",
                id: level.name.clone(),
            });
        }
        if !thresholds.insert(level.threshold) {
            errors.push(ValidationError::InvalidValue {
                context: format!("threshold {} used by more than one level", level.threshold),
            });
        }
    }

    errors
}

fn check_variant(npc_id: &str, variant: &ScriptVariant, errors: &mut Vec<ValidationError>) {
    let context = format!("npc '{npc_id}', variant '{}'", variant.id);
    if variant.lines.is_empty() {
        errors.push(ValidationError::Empty {
            kind: "script",
            context,
        });
        return;
    }

    // jumping to `len` is allowed and ends the conversation
    let line_count = variant.lines.len();
    for (line_idx, line) in variant.lines.iter().enumerate() {
        for (choice_idx, choice) in line.choices.iter().enumerate() {
            if choice.text.trim().is_empty() {
                errors.push(ValidationError::InvalidValue {
                    context: format!("{context}, line {line_idx}, choice {choice_idx} has blank text"),
                });
            }
            if let Some(next) = choice.next_index
                && next > line_count
            {
                errors.push(ValidationError::InvalidValue {
                    context: format!(
                        "{context}, line {line_idx}, choice {choice_idx} jumps to line {next} of {line_count}"
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn npc(id: &str, variants: Vec<ScriptVariant>) -> NpcDialogueDef {
        NpcDialogueDef {
            id: id.into(),
            name: id.into(),
            mission_id: None,
            variants,
        }
    }

    fn variant(id: &str, lines: Vec<DialogueLine>) -> ScriptVariant {
        ScriptVariant {
            id: id.into(),
            when: Vec::new(),
            lines,
        }
    }

    #[test]
    fn duplicate_npc_and_variant_ids_are_reported() {
        let line = DialogueLine::say(None, "...");
        let def = DialogueDef {
            npcs: vec![
                npc(
                    "ana",
                    vec![variant("a", vec![line.clone()]), variant("a", vec![line.clone()])],
                ),
                npc("ana", vec![variant("b", vec![line])]),
            ],
        };
        let errors = validate_dialogue(&def);
        assert!(errors.contains(&ValidationError::DuplicateId {
            kind: "npc",
            id: "ana".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateId {
            kind: "variant",
            id: "ana/a".into()
        }));
    }

    #[test]
    fn choice_jump_past_end_is_invalid() {
        let lines = vec![
            DialogueLine::say(None, "Pergunta?").with_choices(vec![
                Choice::new("fim").jump_to(1),
                Choice::new("longe").jump_to(7),
            ]),
        ];
        let def = DialogueDef {
            npcs: vec![npc("ana", vec![variant("a", lines)])],
        };
        let errors = validate_dialogue(&def);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("jumps to line 7"));
    }

    #[test]
    fn empty_scripts_are_reported() {
        let def = DialogueDef {
            npcs: vec![npc("ana", vec![variant("a", Vec::new())]), npc("bia", Vec::new())],
        };
        assert_eq!(validate_dialogue(&def).len(), 2);
    }

    #[test]
    fn level_table_requires_zero_threshold_and_unique_entries() {
        assert!(validate_levels(&[]).len() == 1);

        let levels = vec![
            LevelDef::new("Junior", 100, ""),
            LevelDef::new("Junior", 100, ""),
        ];
        let errors = validate_levels(&levels);
        assert_eq!(errors.len(), 3);

        let good = vec![LevelDef::new("Novato", 0, ""), LevelDef::new("Junior", 100, "")];
        assert!(validate_levels(&good).is_empty());
    }
}
