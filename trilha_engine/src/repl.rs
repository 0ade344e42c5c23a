//! REPL host for the dialogue engine.
//!
//! Reads commands from the terminal, feeds them to the [`DialogueController`]
//! and [`ProgressionStore`], plays text reveals by sleeping between ticks and
//! reports progress changes through the [`View`].

mod input;

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result, bail};
use log::info;
use serde_json::json;

use crate::command::{Command, HELP_ENTRIES, parse_command};
use crate::dialogue::{DialogueContext, DialogueController, DialogueError, DialogueRenderer, Progress};
use crate::dispatch::MissionFlow;
use crate::progression::{ProgressionStore, SETTING_TEXT_SPEED, SaveStatus};
use crate::style::GameStyle;
use crate::view::{StatusReport, View, ViewItem};

use input::{InputEvent, InputManager};

/// Text speeds accepted by the `speed` command.
pub const TEXT_SPEEDS: &[&str] = &["slow", "normal", "fast", "instant"];

/// Control flow signal used by handlers to exit the REPL.
pub enum ReplControl {
    Continue,
    Quit,
}

/// Mission flow for the terminal host: signals become view items.
#[derive(Debug, Default)]
pub struct SceneMissionFlow {
    events: Vec<ViewItem>,
}

impl SceneMissionFlow {
    /// Take the signals received since the last call.
    pub fn drain(&mut self) -> Vec<ViewItem> {
        std::mem::take(&mut self.events)
    }
}

impl MissionFlow for SceneMissionFlow {
    fn notify_mission_complete(&mut self) {
        self.events.push(ViewItem::SceneComplete);
    }

    fn notify_task_advanced(&mut self, task_id: &str) {
        self.events.push(ViewItem::TaskAdvanced(task_id.to_string()));
    }

    fn update_current_task(&mut self) {
        info!("current task refresh requested");
    }
}

/// Everything a command handler may touch.
struct Host<'a> {
    controller: &'a mut DialogueController,
    store: &'a mut ProgressionStore,
    mission_flow: SceneMissionFlow,
    view: View,
    /// Play reveals with delays; off when stdout is not a terminal.
    animate: bool,
}

/// Run the read–eval–print loop until the player quits.
///
/// # Errors
/// Returns an error only if the terminal cannot be read at all.
pub fn run_repl(controller: &mut DialogueController, store: &mut ProgressionStore) -> Result<()> {
    #[allow(clippy::enum_glob_use)]
    use Command::*;
    let npc_ids: Vec<String> = controller.repository().npc_ids().into_iter().map(str::to_string).collect();
    let mut input_manager = InputManager::new(npc_ids);
    let mut host = Host {
        controller,
        store,
        mission_flow: SceneMissionFlow::default(),
        view: View::new(),
        animate: io::stdout().is_terminal(),
    };

    loop {
        let prompt = host.prompt();
        let input = match input_manager.read_line(&prompt) {
            Ok(InputEvent::Line(line)) => line,
            Ok(InputEvent::Eof) => "quit".to_string(),
            Ok(InputEvent::Interrupted) => {
                host.view.push(ViewItem::EngineMessage("Command canceled.".to_string()));
                host.view.flush();
                continue;
            },
            Err(err) => return Err(err).context("while reading player input"),
        };

        let before = Before::capture(host.store);
        let command = parse_command(&input);
        info!("command: {command:?}");
        let control = match command {
            Talk(npc) => host.dialogue(|controller, ctx| controller.start(&npc, ctx)),
            Advance => {
                if host.controller.is_active() {
                    host.dialogue(DialogueController::advance)
                } else {
                    host.view.push(ViewItem::EngineMessage(
                        "Nobody is talking right now. Try `talk <npc>` or `npcs`.".to_string(),
                    ));
                    ReplControl::Continue
                }
            },
            Skip => host.dialogue(|controller, ctx| controller.skip(ctx.renderer)),
            Choose(index) => host.dialogue(|controller, ctx| controller.select_choice(index, ctx)),
            Status => {
                host.view.push(ViewItem::Status(StatusReport::from_store(host.store)));
                ReplControl::Continue
            },
            Npcs => {
                let npcs = host.controller.repository().npc_ids().into_iter().map(str::to_string).collect();
                host.view.push(ViewItem::NpcList(npcs));
                ReplControl::Continue
            },
            Export(file) => {
                let outcome = export_handler(host.store, &file);
                host.report(outcome)
            },
            Import(file) => {
                let outcome = import_handler(host.store, &file);
                host.report(outcome)
            },
            Speed(speed) => {
                let outcome = speed_handler(host.store, &speed);
                host.report(outcome)
            },
            Reset => {
                host.controller.cancel(&mut host.view);
                host.controller.clear_history();
                host.store.reset();
                host.view
                    .push(ViewItem::EngineMessage("Progress reset. A fresh start!".to_string()));
                ReplControl::Continue
            },
            Help => {
                let entries = HELP_ENTRIES
                    .iter()
                    .map(|(command, summary)| ((*command).to_string(), (*summary).to_string()))
                    .collect();
                host.view.push(ViewItem::Help(entries));
                ReplControl::Continue
            },
            Quit => {
                host.controller.cancel(&mut host.view);
                host.view.push(ViewItem::Status(StatusReport::from_store(host.store)));
                host.view
                    .push(ViewItem::EngineMessage("Até logo! Your progress is saved.".to_string()));
                ReplControl::Quit
            },
            Unknown(text) => {
                host.view.push(ViewItem::Error(format!(
                    "Didn't understand \"{}\". Type `help` for the command list.",
                    text.error_style()
                )));
                ReplControl::Continue
            },
        };

        for event in host.mission_flow.drain() {
            host.view.push(event);
        }
        before.report_changes(host.store, &mut host.view);
        host.view.flush();

        if let ReplControl::Quit = control {
            break;
        }
    }
    Ok(())
}

impl Host<'_> {
    fn prompt(&self) -> String {
        let talking = self
            .controller
            .session()
            .map(|session| format!(" | talking to {}", session.npc_id()))
            .unwrap_or_default();
        format!("\n[{} | {} pts{talking}]>> ", self.store.level().name, self.store.points())
            .hint_style()
            .to_string()
    }

    /// Run a controller operation, play any reveal it starts and report errors.
    fn dialogue(
        &mut self,
        op: impl FnOnce(&mut DialogueController, &mut DialogueContext<'_>) -> Result<Progress, DialogueError>,
    ) -> ReplControl {
        let outcome = {
            let mut ctx = DialogueContext {
                store: &mut *self.store,
                mission_flow: &mut self.mission_flow,
                renderer: &mut self.view,
            };
            op(self.controller, &mut ctx).map(|progress| play(self.controller, progress, ctx.renderer, self.animate))
        };
        match outcome {
            Ok(progress) => info!("dialogue now {:?}", progress.state()),
            // the renderer has already told the player
            Err(DialogueError::ScriptNotFound { .. }) => {},
            Err(err) => self.view.push(ViewItem::Error(err.to_string())),
        }
        ReplControl::Continue
    }

    fn report(&mut self, outcome: Result<String>) -> ReplControl {
        match outcome {
            Ok(message) => self.view.push(ViewItem::EngineMessage(message)),
            Err(err) => self.view.push(ViewItem::Error(format!("{err:#}"))),
        }
        ReplControl::Continue
    }
}

/// Play a reveal to the end, sleeping for each step's delay.
///
/// Without animation the line is skipped to its full text straight away.
fn play(
    controller: &mut DialogueController,
    mut progress: Progress,
    renderer: &mut dyn DialogueRenderer,
    animate: bool,
) -> Progress {
    while let Progress::Reveal(step) = progress {
        if !animate {
            return controller.skip(renderer).unwrap_or(Progress::Closed);
        }
        thread::sleep(step.delay);
        match controller.tick(step.ticket, renderer) {
            Some(next) => progress = next,
            None => break,
        }
    }
    progress
}

/// Progress facts compared before and after each command.
struct Before {
    points: u64,
    rank: usize,
    missions: BTreeSet<String>,
    badges: BTreeSet<String>,
    degraded: bool,
}

impl Before {
    fn capture(store: &ProgressionStore) -> Self {
        Self {
            points: store.points(),
            rank: store.level_rank(),
            missions: store.state().completed_missions.clone(),
            badges: store.state().badges.clone(),
            degraded: store.save_status().is_degraded(),
        }
    }

    /// Queue view items for everything that changed since the capture.
    fn report_changes(&self, store: &ProgressionStore, view: &mut View) {
        if store.points() > self.points {
            view.push(ViewItem::PointsGained {
                amount: store.points() - self.points,
                total: store.points(),
            });
        }
        if store.level_rank() > self.rank {
            view.push(ViewItem::LevelUp {
                name: store.level().name.clone(),
                description: store.level().description.clone(),
            });
        }
        for mission in store.state().completed_missions.difference(&self.missions) {
            view.push(ViewItem::MissionCompleted(mission.clone()));
        }
        for badge in store.state().badges.difference(&self.badges) {
            view.push(ViewItem::BadgeEarned(badge.clone()));
        }
        if let SaveStatus::InMemoryOnly(reason) = store.save_status()
            && !self.degraded
        {
            view.push(ViewItem::StorageWarning(reason.clone()));
        }
    }
}

fn export_handler(store: &ProgressionStore, file: &str) -> Result<String> {
    let text = store.export_as_text()?;
    fs::write(file, text).with_context(|| format!("while writing backup to '{file}'"))?;
    info!("progress exported to '{file}'");
    Ok(format!("Progress exported to {file}."))
}

fn import_handler(store: &mut ProgressionStore, file: &str) -> Result<String> {
    let path = Path::new(file);
    if !path.is_file() {
        bail!("no backup file at '{file}'");
    }
    let text = fs::read_to_string(path).with_context(|| format!("while reading backup '{file}'"))?;
    store
        .import_from_text(&text)
        .with_context(|| format!("while importing '{file}'"))?;
    Ok(format!("Progress restored from {file}."))
}

fn speed_handler(store: &mut ProgressionStore, speed: &str) -> Result<String> {
    if !TEXT_SPEEDS.contains(&speed) {
        bail!("unknown speed '{speed}' (choose one of: {})", TEXT_SPEEDS.join(", "));
    }
    store.set_setting(SETTING_TEXT_SPEED, json!(speed))?;
    Ok(format!("Text speed set to {speed}. It applies from the next conversation."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::levels::LevelTable;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn export_then_import_through_files() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("backup.json");
        let file = file.to_string_lossy();

        let mut source = ProgressionStore::in_memory(LevelTable::default());
        source.add_points(120)?;
        source.add_badge("detetive");
        export_handler(&source, &file)?;

        let mut target = ProgressionStore::in_memory(LevelTable::default());
        import_handler(&mut target, &file)?;
        assert_eq!(target.state(), source.state());
        Ok(())
    }

    #[test]
    fn import_of_missing_file_fails_cleanly() {
        let mut store = ProgressionStore::in_memory(LevelTable::default());
        let err = import_handler(&mut store, "/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("no backup file"));
    }

    #[test]
    fn speed_handler_accepts_known_speeds_only() {
        let mut store = ProgressionStore::in_memory(LevelTable::default());
        speed_handler(&mut store, "fast").unwrap();
        assert_eq!(store.text_speed(), "fast");
        assert!(speed_handler(&mut store, "warp").is_err());
        assert_eq!(store.text_speed(), "fast");
    }

    #[test]
    fn changes_since_capture_become_view_items() {
        let mut store = ProgressionStore::in_memory(LevelTable::default());
        let before = Before::capture(&store);
        store.add_points(100).unwrap();
        store.complete_mission("phishing");

        let mut view = View::new();
        before.report_changes(&store, &mut view);
        assert_eq!(
            view.items,
            vec![
                ViewItem::PointsGained { amount: 100, total: 100 },
                ViewItem::LevelUp {
                    name: "Junior".into(),
                    description: store.level().description.clone(),
                },
                ViewItem::MissionCompleted("phishing".into()),
            ]
        );
    }

    #[test]
    fn mission_flow_signals_are_drained_once() {
        let mut flow = SceneMissionFlow::default();
        flow.notify_task_advanced("ler-email");
        flow.notify_mission_complete();
        assert_eq!(flow.drain().len(), 2);
        assert!(flow.drain().is_empty());
    }
}
