//! Dialogue session controller.
//!
//! A [`DialogueController`] runs at most one conversation at a time. Each
//! conversation walks a resolved script line by line:
//!
//! ```text
//! Idle --start--> Typing --reveal done--> AwaitingAdvance --advance--> Typing | Closed
//!                        \
//!                         `-------------> AwaitingChoice --select_choice--> Typing | Closed
//! ```
//!
//! The controller never sleeps. Revealing text returns [`Progress::Reveal`]
//! with a delay and a ticket; the host waits and calls [`DialogueController::tick`].
//! Player input arrives through `advance`, `skip` and `select_choice`.
//!
//! Line actions run when a line is entered, before its text is revealed.
//! Choice actions run when the choice is selected, before jumping to the next line.

pub mod reveal;

pub use reveal::{RevealPacing, RevealStep, RevealTicket};

use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use trilha_data::{Choice, DialogueLine};
use uuid::Uuid;
use variantly::Variantly;

use crate::dispatch::{self, DispatchContext, MissionFlow};
use crate::progression::ProgressionStore;
use crate::script::{ScriptRepository, SessionHistory};

/// Recoverable dialogue failures. None of them change the active session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogueError {
    #[error("no dialogue available for '{npc_id}' right now")]
    ScriptNotFound { npc_id: String },
    #[error("a conversation with '{npc_id}' is already active")]
    SessionAlreadyActive { npc_id: String },
    #[error("no conversation is active")]
    NoActiveSession,
    #[error("choice {index} is out of range ({available} available)")]
    ChoiceOutOfRange { index: usize, available: usize },
    #[error("the current line has no choices")]
    NotAwaitingChoice,
    #[error("the current line is waiting for a choice")]
    ChoicePending,
}

/// Where a conversation currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Variantly)]
pub enum SessionState {
    #[default]
    Idle,
    Typing,
    AwaitingAdvance,
    AwaitingChoice,
    Closed,
}

/// What the host should do after a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Variantly)]
pub enum Progress {
    /// Wait for the step's delay, then call `tick` with its ticket.
    Reveal(RevealStep),
    AwaitingAdvance,
    AwaitingChoice,
    Closed,
}

impl Progress {
    pub fn state(&self) -> SessionState {
        match self {
            Progress::Reveal(_) => SessionState::Typing,
            Progress::AwaitingAdvance => SessionState::AwaitingAdvance,
            Progress::AwaitingChoice => SessionState::AwaitingChoice,
            Progress::Closed => SessionState::Closed,
        }
    }
}

/// Presentation side of a conversation.
pub trait DialogueRenderer {
    /// Show the current line; `revealed` grows until `complete` is true.
    fn show_text(&mut self, speaker: Option<&str>, revealed: &str, complete: bool);

    /// Offer the current line's choices to the player.
    fn show_choices(&mut self, choices: &[Choice]);

    fn conversation_ended(&mut self, _npc_id: &str) {}

    /// A conversation could not start because no script applies.
    fn script_unavailable(&mut self, _npc_id: &str) {}
}

/// Collaborators a controller call may touch.
pub struct DialogueContext<'a> {
    pub store: &'a mut ProgressionStore,
    pub mission_flow: &'a mut dyn MissionFlow,
    pub renderer: &'a mut dyn DialogueRenderer,
}

/// One active conversation.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    id: Uuid,
    npc_id: String,
    variant_id: String,
    mission_id: Option<String>,
    script: Arc<[DialogueLine]>,
    index: usize,
    state: SessionState,
    revealed: usize,
    pending_choices: Vec<Choice>,
    pacing: RevealPacing,
}

impl DialogueSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn npc_id(&self) -> &str {
        &self.npc_id
    }

    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    pub fn mission_id(&self) -> Option<&str> {
        self.mission_id.as_deref()
    }

    pub fn script(&self) -> &Arc<[DialogueLine]> {
        &self.script
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Choices offered by the current line; empty unless awaiting a choice.
    pub fn pending_choices(&self) -> &[Choice] {
        &self.pending_choices
    }

    pub fn pacing(&self) -> RevealPacing {
        self.pacing
    }

    pub fn current_line(&self) -> Option<&DialogueLine> {
        self.script.get(self.index)
    }

    /// The part of the current line revealed so far.
    pub fn revealed_text(&self) -> &str {
        self.current_line()
            .map_or("", |line| reveal::revealed_prefix(&line.text, self.revealed))
    }
}

/// Drives conversations against a script repository.
#[derive(Debug, Default)]
pub struct DialogueController {
    repository: ScriptRepository,
    history: SessionHistory,
    session: Option<DialogueSession>,
    /// Bumped whenever outstanding reveal tickets must stop applying.
    generation: u64,
}

impl DialogueController {
    pub fn new(repository: ScriptRepository) -> Self {
        Self {
            repository,
            ..Self::default()
        }
    }

    pub fn repository(&self) -> &ScriptRepository {
        &self.repository
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Forget conversation counts and branches, e.g. when starting a new game.
    pub fn clear_history(&mut self) {
        self.history = SessionHistory::default();
    }

    pub fn session(&self) -> Option<&DialogueSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// State of the active session, `Idle` when there is none.
    pub fn state(&self) -> SessionState {
        self.session.as_ref().map_or(SessionState::Idle, DialogueSession::state)
    }

    /// Start a conversation with `npc_id`.
    ///
    /// # Errors
    /// - `SessionAlreadyActive` if a conversation is open; it is left untouched.
    /// - `ScriptNotFound` if no script applies; the renderer is notified.
    pub fn start(&mut self, npc_id: &str, ctx: &mut DialogueContext<'_>) -> Result<Progress, DialogueError> {
        if let Some(active) = &self.session {
            warn!(
                "refusing to talk to '{npc_id}': conversation with '{}' still active",
                active.npc_id
            );
            return Err(DialogueError::SessionAlreadyActive {
                npc_id: active.npc_id.clone(),
            });
        }

        let script = match self.repository.resolve(npc_id, ctx.store.state(), &self.history) {
            Ok(script) => script,
            Err(err) => {
                ctx.renderer.script_unavailable(npc_id);
                return Err(err);
            },
        };

        let session = DialogueSession {
            id: Uuid::new_v4(),
            npc_id: script.npc_id,
            variant_id: script.variant_id,
            mission_id: script.mission_id,
            script: script.lines,
            index: 0,
            state: SessionState::Idle,
            revealed: 0,
            pending_choices: Vec::new(),
            pacing: RevealPacing::from_text_speed(ctx.store.text_speed()),
        };
        info!(
            "conversation {} with '{}' started (variant '{}', {} lines)",
            session.id,
            session.npc_id,
            session.variant_id,
            session.script.len()
        );
        self.session = Some(session);
        Ok(self.enter_line(0, ctx))
    }

    /// Reveal the next character for `ticket`.
    ///
    /// Returns `None` for tickets that no longer apply.
    pub fn tick(&mut self, ticket: RevealTicket, renderer: &mut dyn DialogueRenderer) -> Option<Progress> {
        if ticket.generation != self.generation {
            debug!("ignoring stale reveal tick {ticket:?}");
            return None;
        }
        let session = self.session.as_mut()?;
        if session.state != SessionState::Typing || ticket.step != session.revealed {
            debug!("ignoring out-of-sequence reveal tick {ticket:?}");
            return None;
        }

        let script = Arc::clone(&session.script);
        let line = script.get(session.index)?;
        session.revealed += 1;
        if session.revealed >= line.text.chars().count() {
            return Some(self.finish_reveal(renderer));
        }

        let shown = reveal::revealed_prefix(&line.text, session.revealed);
        renderer.show_text(line.speaker.as_deref(), shown, false);
        let delay = shown
            .chars()
            .next_back()
            .map_or(session.pacing.per_char(), |ch| session.pacing.delay_after(ch));
        Some(Progress::Reveal(RevealStep {
            ticket: RevealTicket {
                generation: self.generation,
                step: session.revealed,
            },
            delay,
        }))
    }

    /// Reveal the current line in full. Outside `Typing` this only reports the state.
    ///
    /// # Errors
    /// Returns `NoActiveSession` if no conversation is open.
    pub fn skip(&mut self, renderer: &mut dyn DialogueRenderer) -> Result<Progress, DialogueError> {
        let state = self.active_state()?;
        Ok(match state {
            SessionState::Typing => {
                debug!("reveal skipped");
                self.finish_reveal(renderer)
            },
            SessionState::AwaitingChoice => Progress::AwaitingChoice,
            _ => Progress::AwaitingAdvance,
        })
    }

    /// Continue the conversation. While typing this behaves like [`skip`](Self::skip).
    ///
    /// # Errors
    /// - `NoActiveSession` if no conversation is open.
    /// - `ChoicePending` if the current line requires a choice.
    pub fn advance(&mut self, ctx: &mut DialogueContext<'_>) -> Result<Progress, DialogueError> {
        let state = self.active_state()?;
        match state {
            SessionState::Typing => Ok(self.finish_reveal(ctx.renderer)),
            SessionState::AwaitingChoice => Err(DialogueError::ChoicePending),
            _ => {
                let next = self.session.as_ref().map_or(0, |session| session.index + 1);
                Ok(self.enter_line(next, ctx))
            },
        }
    }

    /// Pick one of the pending choices.
    ///
    /// # Errors
    /// - `NoActiveSession` if no conversation is open.
    /// - `NotAwaitingChoice` if the current line offers no choices (yet).
    /// - `ChoiceOutOfRange` if `index` is not a pending choice; nothing changes.
    pub fn select_choice(&mut self, index: usize, ctx: &mut DialogueContext<'_>) -> Result<Progress, DialogueError> {
        let session = self.session.as_mut().ok_or(DialogueError::NoActiveSession)?;
        if session.state != SessionState::AwaitingChoice {
            return Err(DialogueError::NotAwaitingChoice);
        }
        let Some(choice) = session.pending_choices.get(index).cloned() else {
            let available = session.pending_choices.len();
            warn!("choice {index} is not one of the {available} offered; ignoring");
            return Err(DialogueError::ChoiceOutOfRange { index, available });
        };

        let current = session.index;
        let mission_id = session.mission_id.clone();
        session.pending_choices.clear();
        info!("'{}' choice {index} selected: \"{}\"", session.npc_id, choice.text);

        if let Some(branch) = &choice.branch {
            self.history.record_branch(branch);
        }
        if !choice.on_select.is_empty() {
            let mut dispatch_ctx = DispatchContext {
                store: &mut *ctx.store,
                mission_flow: &mut *ctx.mission_flow,
                mission_id: mission_id.as_deref(),
            };
            dispatch::execute(&choice.on_select, &mut dispatch_ctx);
        }

        let next = choice.next_index.unwrap_or(current + 1);
        Ok(self.enter_line(next, ctx))
    }

    /// End the active conversation early. Returns `false` if none was open.
    pub fn cancel(&mut self, renderer: &mut dyn DialogueRenderer) -> bool {
        if self.session.is_none() {
            return false;
        }
        self.close(renderer);
        true
    }

    fn active_state(&self) -> Result<SessionState, DialogueError> {
        self.session
            .as_ref()
            .map(DialogueSession::state)
            .ok_or(DialogueError::NoActiveSession)
    }

    /// Move to line `index`, running its actions, or close past the end.
    fn enter_line(&mut self, index: usize, ctx: &mut DialogueContext<'_>) -> Progress {
        self.generation += 1;
        let (script, mission_id) = match &self.session {
            Some(session) => (Arc::clone(&session.script), session.mission_id.clone()),
            None => return Progress::Closed,
        };
        let Some(line) = script.get(index) else {
            debug!("line {index} is past the end of the script");
            return self.close(ctx.renderer);
        };

        if !line.actions.is_empty() {
            let mut dispatch_ctx = DispatchContext {
                store: &mut *ctx.store,
                mission_flow: &mut *ctx.mission_flow,
                mission_id: mission_id.as_deref(),
            };
            dispatch::execute(&line.actions, &mut dispatch_ctx);
        }

        let Some(session) = self.session.as_mut() else {
            return Progress::Closed;
        };
        session.index = index;
        session.revealed = 0;
        session.pending_choices.clear();
        session.state = SessionState::Typing;

        if session.pacing.is_instant() || line.text.is_empty() {
            return self.finish_reveal(ctx.renderer);
        }
        Progress::Reveal(RevealStep {
            ticket: RevealTicket {
                generation: self.generation,
                step: 0,
            },
            delay: session.pacing.per_char(),
        })
    }

    fn finish_reveal(&mut self, renderer: &mut dyn DialogueRenderer) -> Progress {
        self.generation += 1;
        let Some(session) = self.session.as_mut() else {
            return Progress::Closed;
        };
        let script = Arc::clone(&session.script);
        let Some(line) = script.get(session.index) else {
            return self.close(renderer);
        };

        session.revealed = line.text.chars().count();
        renderer.show_text(line.speaker.as_deref(), &line.text, true);
        if line.has_choices() {
            session.pending_choices = line.choices.clone();
            session.state = SessionState::AwaitingChoice;
            renderer.show_choices(&session.pending_choices);
            Progress::AwaitingChoice
        } else {
            session.state = SessionState::AwaitingAdvance;
            Progress::AwaitingAdvance
        }
    }

    fn close(&mut self, renderer: &mut dyn DialogueRenderer) -> Progress {
        self.generation += 1;
        if let Some(session) = self.session.take() {
            self.history.record_conversation(&session.npc_id);
            info!("conversation {} with '{}' closed", session.id, session.npc_id);
            renderer.conversation_ended(&session.npc_id);
        }
        Progress::Closed
    }
}
