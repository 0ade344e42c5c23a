//! Terminal input handling for the REPL.
//!
//! Uses rustyline (with history and command completion) on an interactive
//! terminal and falls back to plain stdin otherwise.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

/// Outcome of reading a line from the REPL input.
pub enum InputEvent {
    Line(String),
    Eof,
    Interrupted,
}

const COMMAND_WORDS: &[&str] = &[
    "export", "help", "import", "next", "npcs", "quit", "reset", "skip", "speed", "status", "talk",
];

const SPEED_WORDS: &[&str] = &["fast", "instant", "normal", "slow"];

type ReplEditor = rustyline::Editor<TrilhaHelper, DefaultHistory>;

/// Completes command words, NPC ids after `talk` and speeds after `speed`.
#[derive(Default)]
struct TrilhaHelper {
    npc_ids: Vec<String>,
}

impl Helper for TrilhaHelper {}

impl Completer for TrilhaHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let (start, prefix) = current_word(line, pos);
        let previous: Vec<&str> = line[..start].split_whitespace().collect();
        let candidates: Vec<String> = match previous.as_slice() {
            [] => complete_from(COMMAND_WORDS.iter().copied(), prefix),
            ["talk" | "falar"] | ["talk" | "falar", "to" | "with" | "com"] => {
                complete_from(self.npc_ids.iter().map(String::as_str), prefix)
            },
            ["speed"] => complete_from(SPEED_WORDS.iter().copied(), prefix),
            _ => Vec::new(),
        };
        let pairs = candidates
            .into_iter()
            .map(|term| Pair {
                display: term.clone(),
                replacement: term,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for TrilhaHelper {
    type Hint = String;
}

impl Highlighter for TrilhaHelper {}

impl Validator for TrilhaHelper {}

/// Start offset and text of the word under the cursor.
fn current_word(line: &str, pos: usize) -> (usize, &str) {
    let slice = &line[..pos];
    let start = slice.rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
    (start, &slice[start..])
}

fn complete_from<'a>(terms: impl Iterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    let lower = prefix.to_lowercase();
    terms
        .filter(|term| term.starts_with(&lower))
        .map(str::to_string)
        .collect()
}

/// Helper responsible for managing the interactive input backend.
pub struct InputManager {
    backend: Backend,
}

impl InputManager {
    pub fn new(npc_ids: Vec<String>) -> Self {
        let backend = if io::stdin().is_terminal() {
            match RustylineInput::new(npc_ids) {
                Ok(editor) => {
                    info!("using rustyline-backed REPL input");
                    Backend::Rustyline(editor)
                },
                Err(err) => {
                    warn!("failed to initialize rustyline ({err}), falling back to basic stdin");
                    Backend::plain()
                },
            }
        } else {
            info!("stdin is not a TTY; using basic input mode");
            Backend::plain()
        };

        Self { backend }
    }

    /// Read a line from the current backend. If the interactive backend reports an
    /// unrecoverable error, switch to the plain stdin backend and retry once.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self.backend.read_line(prompt) {
            Ok(event) => Ok(event),
            Err(err) => {
                if self.backend.is_rustyline() {
                    warn!("rustyline input failed: {err} -- switching to basic stdin");
                    self.backend = Backend::plain();
                    self.backend.read_line(prompt)
                } else {
                    Err(err)
                }
            },
        }
    }
}

enum Backend {
    Rustyline(Box<RustylineInput>),
    Plain(StdinInput),
}

impl Backend {
    fn plain() -> Self {
        Backend::Plain(StdinInput::default())
    }

    fn is_rustyline(&self) -> bool {
        matches!(self, Backend::Rustyline(_))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self {
            Backend::Rustyline(editor) => editor.read_line(prompt),
            Backend::Plain(stdin) => stdin.read_line(prompt),
        }
    }
}

struct RustylineInput {
    editor: ReplEditor,
    history_path: Option<PathBuf>,
}

impl RustylineInput {
    fn new(npc_ids: Vec<String>) -> io::Result<Box<Self>> {
        let mut editor = ReplEditor::new().map_err(map_io_err)?;
        editor.set_helper(Some(TrilhaHelper { npc_ids }));
        let history_path = history_file_path();

        if let Some(path) = history_path.as_ref() {
            if let Some(dir) = path.parent()
                && let Err(err) = fs::create_dir_all(dir)
            {
                warn!("failed to create history directory {}: {err}", dir.display());
            }

            if let Err(err) = editor.load_history(path) {
                match err {
                    ReadlineError::Io(ref io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                        info!("no prior history found at {}, starting fresh", path.display());
                    },
                    other => {
                        warn!("failed to load history from {}: {other}", path.display());
                    },
                }
            }
        }

        Ok(Box::new(Self { editor, history_path }))
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        warn!("failed to append to history: {err}");
                    }
                    if let Some(path) = self.history_path.as_ref()
                        && let Err(err) = self.editor.save_history(path)
                    {
                        warn!("failed to persist history to {}: {err}", path.display());
                    }
                }
                Ok(InputEvent::Line(line))
            },
            Err(err) => convert_readline_error(err),
        }
    }
}

#[derive(Default)]
struct StdinInput {
    buffer: String,
}

impl StdinInput {
    fn read_line(&mut self, prompt: &str) -> io::Result<InputEvent> {
        print!("{prompt}");
        io::stdout().flush()?;

        self.buffer.clear();
        let bytes = io::stdin().read_line(&mut self.buffer)?;
        if bytes == 0 {
            return Ok(InputEvent::Eof);
        }

        if self.buffer.ends_with('\n') {
            self.buffer.pop();
            if self.buffer.ends_with('\r') {
                self.buffer.pop();
            }
        }

        Ok(InputEvent::Line(self.buffer.clone()))
    }
}

fn convert_readline_error(err: ReadlineError) -> io::Result<InputEvent> {
    match err {
        ReadlineError::Interrupted => Ok(InputEvent::Interrupted),
        ReadlineError::Eof => Ok(InputEvent::Eof),
        ReadlineError::Io(io_err) => Err(io_err),
        other => Err(io::Error::other(other)),
    }
}

fn map_io_err(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(io_err) => io_err,
        other => io::Error::other(other),
    }
}

fn history_file_path() -> Option<PathBuf> {
    dirs::data_dir()
        .or_else(dirs::data_local_dir)
        .map(|base| build_history_path(&base))
}

fn build_history_path(base: &Path) -> PathBuf {
    let mut path = base.to_path_buf();
    path.push("trilha");
    path.push("history.txt");
    path
}
