//! View module.
//!
//! Dialogue text is written to the terminal as soon as the controller reveals
//! it. Everything else (progress changes, status, help, errors) is collected
//! as [`ViewItem`]s while a command runs and displayed together by
//! [`View::flush`] before the next prompt.

use std::io::{self, Write};

use colored::Colorize;
use log::warn;
use textwrap::{Options, fill, termwidth};
use trilha_data::Choice;
use variantly::Variantly;

use crate::dialogue::DialogueRenderer;
use crate::progression::ProgressionStore;
use crate::style::GameStyle;

const ICON_POSITIVE: &str = "➕";
const ICON_CELEBRATE: &str = "🎉"; // U+1F389
const ICON_BADGE: &str = "★";
const ICON_MISSION: &str = "\u{2611}"; // ✔
const ICON_TASK: &str = "→"; // U+2192
const ICON_ERROR: &str = "⚠︎"; // U+26A0 U+FE0E
const ICON_ENGINE: &str = "⚙";

/// Information to display after a command.
#[derive(Debug, Clone, PartialEq, Variantly)]
pub enum ViewItem {
    BadgeEarned(String),
    ConversationEnded(String),
    EngineMessage(String),
    Error(String),
    Help(Vec<(String, String)>),
    LevelUp { name: String, description: String },
    MissionCompleted(String),
    NoDialogue(String),
    NpcList(Vec<String>),
    PointsGained { amount: u64, total: u64 },
    SceneComplete,
    Status(StatusReport),
    StorageWarning(String),
    TaskAdvanced(String),
}

/// Snapshot of the player's progress for the `status` command.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub points: u64,
    pub level: String,
    pub level_description: String,
    pub next_level: Option<(String, u64)>,
    pub progress: f64,
    pub missions: Vec<String>,
    pub badges: Vec<String>,
    pub text_speed: String,
    pub storage_warning: Option<String>,
}

impl StatusReport {
    pub fn from_store(store: &ProgressionStore) -> Self {
        let state = store.state();
        Self {
            points: store.points(),
            level: store.level().name.clone(),
            level_description: store.level().description.clone(),
            next_level: store.next_level().map(|next| (next.name.clone(), next.threshold)),
            progress: store.progress(),
            missions: state.completed_missions.iter().cloned().collect(),
            badges: state.badges.iter().cloned().collect(),
            text_speed: store.text_speed().to_string(),
            storage_warning: match store.save_status() {
                crate::progression::SaveStatus::Persisted => None,
                crate::progression::SaveStatus::InMemoryOnly(reason) => Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Conversation,
    Progress,
    System,
}

impl ViewItem {
    fn section(&self) -> Section {
        match self {
            ViewItem::ConversationEnded(_) | ViewItem::NoDialogue(_) => Section::Conversation,
            ViewItem::BadgeEarned(_)
            | ViewItem::LevelUp { .. }
            | ViewItem::MissionCompleted(_)
            | ViewItem::PointsGained { .. }
            | ViewItem::SceneComplete
            | ViewItem::TaskAdvanced(_) => Section::Progress,
            ViewItem::EngineMessage(_)
            | ViewItem::Error(_)
            | ViewItem::Help(_)
            | ViewItem::NpcList(_)
            | ViewItem::Status(_)
            | ViewItem::StorageWarning(_) => Section::System,
        }
    }
}

/// Terminal presentation for the demo host.
#[derive(Debug, Clone)]
pub struct View {
    pub width: usize,
    pub items: Vec<ViewItem>,
    /// Characters of the current dialogue line already written.
    printed: usize,
    line_open: bool,
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    pub fn new() -> Self {
        Self {
            width: termwidth(),
            items: Vec::new(),
            printed: 0,
            line_open: false,
        }
    }

    pub fn push(&mut self, item: ViewItem) {
        self.items.push(item);
    }

    /// Display and clear everything collected for this command.
    pub fn flush(&mut self) {
        // re-check terminal width in case it's been resized
        self.width = termwidth();

        for (section, title) in [
            (Section::Conversation, "conversation"),
            (Section::Progress, "progress"),
            (Section::System, "game"),
        ] {
            let entries: Vec<&ViewItem> = self.items.iter().filter(|item| item.section() == section).collect();
            if entries.is_empty() {
                continue;
            }
            println!("\n{:.>width$}\n", title.section_style(), width = self.width);
            for item in entries {
                self.render(item);
            }
        }
        self.items.clear();
    }

    fn render(&self, item: &ViewItem) {
        match item {
            ViewItem::BadgeEarned(badge) => {
                println!("{:<4}Badge earned: {}", ICON_BADGE.badge_style(), badge.badge_style());
            },
            ViewItem::ConversationEnded(npc) => {
                println!("{}", format!("(conversation with {npc} ended)").hint_style());
            },
            ViewItem::EngineMessage(msg) => {
                println!("{}", fill(&format!("{ICON_ENGINE:<4}{msg}"), normal_block(self.width)));
            },
            ViewItem::Error(msg) => {
                println!(
                    "{}",
                    fill(&format!("{ICON_ERROR:<4}{}", msg.error_style()), normal_block(self.width))
                );
            },
            ViewItem::Help(entries) => Self::help(entries),
            ViewItem::LevelUp { name, description } => {
                println!("{:<4}Level up! You are now {}", ICON_CELEBRATE, name.level_style());
                if !description.is_empty() {
                    println!("{}", fill(description, indented_block(self.width)).narration_style());
                }
            },
            ViewItem::MissionCompleted(mission) => {
                println!("{:<4}Mission complete: {}", ICON_MISSION.green(), mission.mission_style());
            },
            ViewItem::NoDialogue(npc) => {
                println!("{}", format!("{npc} has nothing to say right now.").warning_style());
            },
            ViewItem::NpcList(npcs) => {
                println!("{}", "You can talk to:".subheading_style());
                for npc in npcs {
                    println!("  • {}", npc.speaker_style());
                }
            },
            ViewItem::PointsGained { amount, total } => {
                let plural = if *amount == 1 { "" } else { "s" };
                println!(
                    "{:<4}{}",
                    ICON_POSITIVE.bright_green(),
                    format!("+{amount} point{plural} (total {total})").points_style()
                );
            },
            ViewItem::SceneComplete => {
                println!("{:<4}{}", ICON_MISSION.green(), "Scene objective achieved.".mission_style());
            },
            ViewItem::Status(report) => self.status(report),
            ViewItem::StorageWarning(reason) => {
                println!(
                    "{}",
                    fill(
                        &format!("Progress is only kept in memory: {reason}"),
                        normal_block(self.width)
                    )
                    .warning_style()
                );
            },
            ViewItem::TaskAdvanced(task) => {
                println!("{:<4}Task done: {}", ICON_TASK.cyan(), task.mission_style());
            },
        }
    }

    fn status(&self, report: &StatusReport) {
        println!("{}", "Progress".subheading_style());
        println!(
            "  Level:    {} ({} points)",
            report.level.level_style(),
            report.points.to_string().points_style()
        );
        if !report.level_description.is_empty() {
            println!("{}", fill(&report.level_description, indented_block(self.width)).narration_style());
        }
        match &report.next_level {
            Some((name, threshold)) => println!(
                "  Next:     {} at {threshold} points [{}] {:.0}%",
                name.level_style(),
                progress_bar(report.progress, 20),
                report.progress * 100.0
            ),
            None => println!("  Next:     {}", "top level reached".hint_style()),
        }
        println!("  Missions: {}", list_or_none(&report.missions).mission_style());
        println!("  Badges:   {}", list_or_none(&report.badges).badge_style());
        println!("  Speed:    {}", report.text_speed);
        if let Some(reason) = &report.storage_warning {
            println!("  {}", format!("Not saving to disk: {reason}").warning_style());
        }
    }

    fn help(entries: &[(String, String)]) {
        println!("{}", "Commands".subheading_style());
        for (command, summary) in entries {
            println!("  {:<36}{}", command.choice_style(), summary);
        }
    }

    fn flush_stdout() {
        if let Err(err) = io::stdout().flush() {
            warn!("failed to flush stdout: {err}");
        }
    }
}

impl DialogueRenderer for View {
    fn show_text(&mut self, speaker: Option<&str>, revealed: &str, complete: bool) {
        if !self.line_open {
            println!();
            if let Some(name) = speaker {
                println!("{}", name.speaker_style());
            }
            self.line_open = true;
            self.printed = 0;

            if complete {
                // shown in one go: wrap it properly
                let wrapped = fill(revealed, indented_block(self.width));
                println!("{}", styled_speech(&wrapped, speaker.is_some()));
                self.line_open = false;
                return;
            }
            print!("  ");
        }

        let fresh: String = revealed.chars().skip(self.printed).collect();
        print!("{}", styled_speech(&fresh, speaker.is_some()));
        self.printed = revealed.chars().count();
        if complete {
            println!();
            self.line_open = false;
        }
        Self::flush_stdout();
    }

    fn show_choices(&mut self, choices: &[Choice]) {
        println!();
        for (idx, choice) in choices.iter().enumerate() {
            println!(
                "  {} {}",
                format!("{}.", idx + 1).choice_index_style(),
                choice.text.choice_style()
            );
        }
    }

    fn conversation_ended(&mut self, npc_id: &str) {
        self.push(ViewItem::ConversationEnded(npc_id.to_string()));
    }

    fn script_unavailable(&mut self, npc_id: &str) {
        self.push(ViewItem::NoDialogue(npc_id.to_string()));
    }
}

fn styled_speech(text: &str, spoken: bool) -> String {
    if spoken {
        text.dialogue_style().to_string()
    } else {
        text.narration_style().to_string()
    }
}

/// Wrapping options for full-width text.
pub fn normal_block(width: usize) -> Options<'static> {
    Options::new(width)
}

/// Wrapping options for text indented under a heading.
pub fn indented_block(width: usize) -> Options<'static> {
    Options::new(width.saturating_sub(2).max(20))
        .initial_indent("  ")
        .subsequent_indent("  ")
}

/// Text progress bar, `fraction` clamped to `[0, 1]`.
pub fn progress_bar(fraction: f64, cells: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((fraction * cells as f64).round() as usize).min(cells);
    format!("{}{}", "█".repeat(filled), "░".repeat(cells - filled))
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none yet".to_string()
    } else {
        values.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelTable;

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0, 4), "░░░░");
        assert_eq!(progress_bar(0.5, 4), "██░░");
        assert_eq!(progress_bar(1.7, 4), "████");
    }

    #[test]
    fn status_report_reflects_store() {
        let mut store = ProgressionStore::in_memory(LevelTable::default());
        store.add_points(150).unwrap();
        store.complete_mission("phishing");
        let report = StatusReport::from_store(&store);
        assert_eq!(report.level, "Junior");
        assert_eq!(report.missions, vec!["phishing".to_string()]);
        assert_eq!(report.next_level, Some(("Pleno".to_string(), 300)));
        assert!(report.storage_warning.is_none());
    }

    #[test]
    fn renderer_notifications_are_queued() {
        let mut view = View::new();
        view.conversation_ended("ana");
        view.script_unavailable("bruno");
        assert_eq!(
            view.items,
            vec![
                ViewItem::ConversationEnded("ana".into()),
                ViewItem::NoDialogue("bruno".into())
            ]
        );
        assert_eq!(view.items[0].section(), Section::Conversation);
    }
}
