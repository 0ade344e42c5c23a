//! Dialogue script repository.
//!
//! Maps an NPC and the current game state to the script that should play.
//! Each NPC owns an ordered list of variants; the first variant whose
//! conditions all hold is selected. Resolution is a pure function of the
//! progression snapshot and the session history, and returns a shared
//! reference to the stored lines, so identical inputs always give the same
//! script.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, warn};
use trilha_data::{DialogueDef, DialogueLine, ScriptCondition};

use crate::dialogue::DialogueError;
use crate::progression::ProgressionState;

/// Conversation facts remembered across sessions within a play session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHistory {
    talk_counts: HashMap<String, u32>,
    branches: BTreeSet<String>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of finished conversations with `npc_id`.
    pub fn times_talked(&self, npc_id: &str) -> u32 {
        self.talk_counts.get(npc_id).copied().unwrap_or(0)
    }

    pub fn branch_taken(&self, branch: &str) -> bool {
        self.branches.contains(branch)
    }

    pub fn record_conversation(&mut self, npc_id: &str) {
        *self.talk_counts.entry(npc_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_branch(&mut self, branch: &str) {
        self.branches.insert(branch.to_string());
    }
}

/// A script selected for one conversation.
#[derive(Debug, Clone)]
pub struct ResolvedScript {
    pub npc_id: String,
    pub variant_id: String,
    /// Mission completed by `CompleteMission` tokens in this script.
    pub mission_id: Option<String>,
    pub lines: Arc<[DialogueLine]>,
}

#[derive(Debug, Clone)]
struct Variant {
    id: String,
    when: Vec<ScriptCondition>,
    lines: Arc<[DialogueLine]>,
}

#[derive(Debug, Clone)]
struct NpcScripts {
    mission_id: Option<String>,
    variants: Vec<Variant>,
}

/// Read-only store of every NPC's script variants.
#[derive(Debug, Clone, Default)]
pub struct ScriptRepository {
    npcs: HashMap<String, NpcScripts>,
}

impl ScriptRepository {
    /// Build a repository from a dialogue catalog.
    ///
    /// Variants without lines can never open a conversation; they are dropped
    /// here so resolution falls through to the next applicable variant.
    pub fn from_def(def: DialogueDef) -> Self {
        let npcs = def
            .npcs
            .into_iter()
            .map(|npc| {
                let npc_id = npc.id.clone();
                let variants = npc
                    .variants
                    .into_iter()
                    .filter(|variant| {
                        if variant.lines.is_empty() {
                            warn!("dropping script variant '{}' of NPC '{npc_id}': it has no lines", variant.id);
                        }
                        !variant.lines.is_empty()
                    })
                    .map(|variant| Variant {
                        id: variant.id,
                        when: variant.when,
                        lines: Arc::from(variant.lines),
                    })
                    .collect();
                (
                    npc.id,
                    NpcScripts {
                        mission_id: npc.mission_id,
                        variants,
                    },
                )
            })
            .collect();
        Self { npcs }
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn has_npc(&self, npc_id: &str) -> bool {
        self.npcs.contains_key(npc_id)
    }

    /// NPC ids in sorted order.
    pub fn npc_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.npcs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Select the script for `npc_id` given the current state.
    ///
    /// # Errors
    /// Returns `ScriptNotFound` if the NPC is unknown or no variant's conditions hold.
    pub fn resolve(
        &self,
        npc_id: &str,
        progression: &ProgressionState,
        history: &SessionHistory,
    ) -> Result<ResolvedScript, DialogueError> {
        let not_found = || DialogueError::ScriptNotFound {
            npc_id: npc_id.to_string(),
        };
        let Some(npc) = self.npcs.get(npc_id) else {
            warn!("no dialogue defined for NPC '{npc_id}'");
            return Err(not_found());
        };

        let Some(variant) = npc.variants.iter().find(|variant| {
            variant
                .when
                .iter()
                .all(|cond| condition_holds(cond, npc_id, progression, history))
        }) else {
            warn!("no script variant of NPC '{npc_id}' applies to the current state");
            return Err(not_found());
        };
        debug!("NPC '{npc_id}' resolved to script variant '{}'", variant.id);

        Ok(ResolvedScript {
            npc_id: npc_id.to_string(),
            variant_id: variant.id.clone(),
            mission_id: npc.mission_id.clone(),
            lines: Arc::clone(&variant.lines),
        })
    }
}

/// Evaluate one variant condition against the current state.
pub fn condition_holds(
    condition: &ScriptCondition,
    npc_id: &str,
    progression: &ProgressionState,
    history: &SessionHistory,
) -> bool {
    match condition {
        ScriptCondition::MissionCompleted { mission_id } => progression.completed_missions.contains(mission_id),
        ScriptCondition::MissionNotCompleted { mission_id } => !progression.completed_missions.contains(mission_id),
        ScriptCondition::HasBadge { badge_id } => progression.badges.contains(badge_id),
        ScriptCondition::MissingBadge { badge_id } => !progression.badges.contains(badge_id),
        ScriptCondition::MinPoints { points } => progression.points >= *points,
        ScriptCondition::MinLevel { rank } => progression.level_rank >= *rank,
        ScriptCondition::TalkedAtLeast { times } => history.times_talked(npc_id) >= *times,
        ScriptCondition::BranchTaken { branch } => history.branch_taken(branch),
        ScriptCondition::BranchNotTaken { branch } => !history.branch_taken(branch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trilha_data::{NpcDialogueDef, ScriptVariant};

    fn repo() -> ScriptRepository {
        ScriptRepository::from_def(DialogueDef {
            npcs: vec![NpcDialogueDef {
                id: "ana".into(),
                name: "Ana".into(),
                mission_id: Some("phishing".into()),
                variants: vec![
                    ScriptVariant {
                        id: "after".into(),
                        when: vec![ScriptCondition::MissionCompleted {
                            mission_id: "phishing".into(),
                        }],
                        lines: vec![DialogueLine::say(Some("Ana"), "Obrigada pela ajuda!")],
                    },
                    ScriptVariant {
                        id: "reported".into(),
                        when: vec![ScriptCondition::BranchTaken {
                            branch: "official_platform".into(),
                        }],
                        lines: vec![DialogueLine::say(Some("Ana"), "Você denunciou, certo?")],
                    },
                    ScriptVariant {
                        id: "again".into(),
                        when: vec![ScriptCondition::TalkedAtLeast { times: 1 }],
                        lines: vec![DialogueLine::say(Some("Ana"), "De novo por aqui?")],
                    },
                    ScriptVariant {
                        id: "intro".into(),
                        when: Vec::new(),
                        lines: vec![DialogueLine::say(Some("Ana"), "Recebi um e-mail estranho.")],
                    },
                ],
            }],
        })
    }

    #[test]
    fn resolve_is_deterministic_and_shares_lines() {
        let repo = repo();
        let state = ProgressionState::default();
        let history = SessionHistory::new();
        let a = repo.resolve("ana", &state, &history).unwrap();
        let b = repo.resolve("ana", &state, &history).unwrap();
        assert_eq!(a.variant_id, "intro");
        assert!(Arc::ptr_eq(&a.lines, &b.lines));
        assert_eq!(a.mission_id.as_deref(), Some("phishing"));
    }

    #[test]
    fn state_changes_select_different_variants() {
        let repo = repo();
        let mut state = ProgressionState::default();
        let mut history = SessionHistory::new();

        history.record_conversation("ana");
        assert_eq!(repo.resolve("ana", &state, &history).unwrap().variant_id, "again");

        history.record_branch("official_platform");
        assert_eq!(repo.resolve("ana", &state, &history).unwrap().variant_id, "reported");

        state.completed_missions.insert("phishing".into());
        let after = repo.resolve("ana", &state, &history).unwrap();
        assert_eq!(after.variant_id, "after");
        assert_eq!(after.lines[0].text, "Obrigada pela ajuda!");
    }

    #[test]
    fn unknown_npc_or_no_matching_variant_is_not_found() {
        let repo = repo();
        let err = repo
            .resolve("bruno", &ProgressionState::default(), &SessionHistory::new())
            .unwrap_err();
        assert!(matches!(err, DialogueError::ScriptNotFound { npc_id } if npc_id == "bruno"));

        let gated = ScriptRepository::from_def(DialogueDef {
            npcs: vec![NpcDialogueDef {
                id: "chefe".into(),
                name: "Chefe".into(),
                mission_id: None,
                variants: vec![ScriptVariant {
                    id: "veteran".into(),
                    when: vec![ScriptCondition::MinLevel { rank: 2 }],
                    lines: vec![DialogueLine::say(None, "...")],
                }],
            }],
        });
        assert!(
            gated
                .resolve("chefe", &ProgressionState::default(), &SessionHistory::new())
                .is_err()
        );
    }

    #[test]
    fn variants_without_lines_never_resolve() {
        let repo = ScriptRepository::from_def(DialogueDef {
            npcs: vec![NpcDialogueDef {
                id: "ana".into(),
                name: "Ana".into(),
                mission_id: None,
                variants: vec![
                    ScriptVariant {
                        id: "blank".into(),
                        when: Vec::new(),
                        lines: Vec::new(),
                    },
                    ScriptVariant {
                        id: "intro".into(),
                        when: Vec::new(),
                        lines: vec![DialogueLine::say(None, "Oi!")],
                    },
                ],
            }],
        });
        let resolved = repo
            .resolve("ana", &ProgressionState::default(), &SessionHistory::new())
            .unwrap();
        assert_eq!(resolved.variant_id, "intro");
        assert!(repo.has_npc("ana"));
        assert!(!repo.has_npc("bruno"));
    }

    #[test]
    fn conditions_read_progression_fields() {
        let history = SessionHistory::new();
        let mut state = ProgressionState::default();
        state.points = 150;
        state.level_rank = 1;
        state.badges.insert("detetive".into());

        let holds = |cond: ScriptCondition| condition_holds(&cond, "ana", &state, &history);
        assert!(holds(ScriptCondition::MinPoints { points: 150 }));
        assert!(!holds(ScriptCondition::MinPoints { points: 151 }));
        assert!(holds(ScriptCondition::MinLevel { rank: 1 }));
        assert!(holds(ScriptCondition::HasBadge {
            badge_id: "detetive".into()
        }));
        assert!(holds(ScriptCondition::MissingBadge {
            badge_id: "hacker".into()
        }));
        assert!(holds(ScriptCondition::MissionNotCompleted {
            mission_id: "phishing".into()
        }));
        assert!(holds(ScriptCondition::BranchNotTaken {
            branch: "ignore".into()
        }));
        assert!(!holds(ScriptCondition::TalkedAtLeast { times: 1 }));
    }
}
