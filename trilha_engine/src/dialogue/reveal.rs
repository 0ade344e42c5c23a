//! Typewriter reveal pacing.
//!
//! The controller reveals a line one character at a time. Each scheduled step
//! carries a [`RevealTicket`]; the host waits for the step's delay and hands the
//! ticket back. Any transition that moves the session on (skip, advance, a new
//! line, closing) invalidates every outstanding ticket, so a late tick can never
//! touch a session that has already moved past it.

use std::time::Duration;

use log::warn;

/// Identifies one scheduled reveal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealTicket {
    pub(crate) generation: u64,
    pub(crate) step: usize,
}

impl RevealTicket {
    /// Number of characters already revealed when this ticket was issued.
    pub fn step(&self) -> usize {
        self.step
    }
}

/// A reveal step the host must schedule: wait `delay`, then tick with `ticket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStep {
    pub ticket: RevealTicket,
    pub delay: Duration,
}

/// Per-character delays for the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealPacing {
    per_char: Duration,
}

impl RevealPacing {
    pub const SLOW: Self = Self::per_char_millis(60);
    pub const NORMAL: Self = Self::per_char_millis(30);
    pub const FAST: Self = Self::per_char_millis(12);
    pub const INSTANT: Self = Self::per_char_millis(0);

    const SENTENCE_PAUSE: u32 = 10;
    const CLAUSE_PAUSE: u32 = 4;

    pub const fn per_char_millis(millis: u64) -> Self {
        Self {
            per_char: Duration::from_millis(millis),
        }
    }

    /// Pacing for a `text_speed` setting value. Unknown values fall back to normal.
    pub fn from_text_speed(speed: &str) -> Self {
        match speed.trim().to_ascii_lowercase().as_str() {
            "slow" => Self::SLOW,
            "normal" => Self::NORMAL,
            "fast" => Self::FAST,
            "instant" => Self::INSTANT,
            other => {
                warn!("unknown text speed '{other}'; using normal pacing");
                Self::NORMAL
            },
        }
    }

    pub fn per_char(&self) -> Duration {
        self.per_char
    }

    /// True if lines should appear in full without scheduled steps.
    pub fn is_instant(&self) -> bool {
        self.per_char.is_zero()
    }

    /// Delay before the character following `ch` is revealed.
    pub fn delay_after(&self, ch: char) -> Duration {
        match ch {
            '.' | '!' | '?' | '…' => self.per_char * Self::SENTENCE_PAUSE,
            ',' | ';' | ':' => self.per_char * Self::CLAUSE_PAUSE,
            _ => self.per_char,
        }
    }
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// The first `count` characters of `text`.
pub fn revealed_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
