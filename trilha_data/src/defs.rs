use serde::{Deserialize, Deserializer, Serialize};

/// Stable identifier used across dialogue and progression references.
pub type Id = String;

/// Top-level dialogue catalog loaded by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DialogueDef {
    #[serde(default)]
    pub npcs: Vec<NpcDialogueDef>,
}

/// All scripted conversations available for one NPC.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NpcDialogueDef {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    /// Mission completed by `CompleteMission` tokens in this NPC's scripts.
    #[serde(default)]
    pub mission_id: Option<Id>,
    /// Ordered script variants; the first whose conditions all hold is used.
    #[serde(default)]
    pub variants: Vec<ScriptVariant>,
}

/// One selectable script for an NPC, guarded by a list of conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptVariant {
    pub id: Id,
    #[serde(default)]
    pub when: Vec<ScriptCondition>,
    pub lines: Vec<DialogueLine>,
}

/// A single line of scripted dialogue.
///
/// A line with choices cannot be advanced with a plain "continue"; the player
/// must select one of them. Line actions run as soon as the line is shown.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DialogueLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionToken>,
}

impl DialogueLine {
    /// Plain narration or speech with no choices or actions.
    pub fn say(speaker: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.map(str::to_string),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_choices(mut self, choices: Vec<Choice>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_actions(mut self, actions: Vec<ActionToken>) -> Self {
        self.actions = actions;
        self
    }

    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// A player-selectable answer on a dialogue line.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Choice {
    pub text: String,
    /// Line to jump to; `None` continues with the following line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_index: Option<usize>,
    /// Stable branch key recorded in the session history when selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<Id>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub on_select: Vec<ActionToken>,
}

impl Choice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn jump_to(mut self, index: usize) -> Self {
        self.next_index = Some(index);
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn on_select(mut self, actions: Vec<ActionToken>) -> Self {
        self.on_select = actions;
        self
    }
}

/// Data-only side effects attached to dialogue lines and choices.
///
/// Tags this build does not know deserialize to [`ActionToken::Unknown`] so
/// newer content still loads; the dispatcher skips them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ActionToken {
    /// Completes the mission owned by the NPC the player is talking to.
    CompleteMission,
    /// Asks the mission flow to refresh the task currently shown to the player.
    UpdateCurrentTask,
    CompleteTask { task_id: Id },
    AwardPoints { amount: i64 },
    AwardBadge { badge_id: Id },
    /// Records an explicit mission as completed, independent of the speaking NPC.
    MarkMission { mission_id: Id },
    #[serde(other)]
    Unknown,
}

/// Conditions used to pick a script variant from the current game state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind")]
pub enum ScriptCondition {
    MissionCompleted { mission_id: Id },
    MissionNotCompleted { mission_id: Id },
    HasBadge { badge_id: Id },
    MissingBadge { badge_id: Id },
    MinPoints { points: u64 },
    MinLevel { rank: usize },
    /// The player has finished at least this many conversations with the NPC.
    TalkedAtLeast { times: u32 },
    BranchTaken { branch: Id },
    BranchNotTaken { branch: Id },
}

/// Progression tier definition, as authored in `levels.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LevelDef {
    pub name: String,
    pub threshold: u64,
    #[serde(default)]
    pub description: String,
}

impl LevelDef {
    pub fn new(name: impl Into<String>, threshold: u64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            threshold,
            description: description.into(),
        }
    }
}

/// Accepts either a single token or a list of tokens for `on_select`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<ActionToken>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(ActionToken),
        Many(Vec<ActionToken>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(token) => vec![token],
        OneOrMany::Many(tokens) => tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_select_accepts_single_token_or_list() {
        let single: Choice =
            serde_json::from_str(r#"{"text": "Sim", "on_select": {"kind": "CompleteMission"}}"#).unwrap();
        assert_eq!(single.on_select, vec![ActionToken::CompleteMission]);

        let many: Choice = serde_json::from_str(
            r#"{"text": "Sim", "on_select": [{"kind": "UpdateCurrentTask"}, {"kind": "CompleteTask", "task_id": "t1"}]}"#,
        )
        .unwrap();
        assert_eq!(
            many.on_select,
            vec![
                ActionToken::UpdateCurrentTask,
                ActionToken::CompleteTask { task_id: "t1".into() }
            ]
        );
    }

    #[test]
    fn unknown_action_kinds_deserialize_as_unknown() {
        let token: ActionToken = serde_json::from_str(r#"{"kind": "PlayFanfare"}"#).unwrap();
        assert_eq!(token, ActionToken::Unknown);
    }

    #[test]
    fn line_defaults_fill_missing_fields() {
        let line: DialogueLine = serde_json::from_str(r#"{"text": "Olá!"}"#).unwrap();
        assert!(line.speaker.is_none());
        assert!(!line.has_choices());
        assert!(line.actions.is_empty());
    }

    #[test]
    fn conditions_use_kind_tag() {
        let cond: ScriptCondition =
            serde_json::from_str(r#"{"kind": "MissionCompleted", "mission_id": "phishing"}"#).unwrap();
        assert_eq!(
            cond,
            ScriptCondition::MissionCompleted {
                mission_id: "phishing".into()
            }
        );
    }
}
