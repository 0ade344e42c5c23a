//! Styling helpers for terminal output.
//!
//! [`GameStyle`] applies ANSI styling via the `colored` crate. It is
//! implemented for `&str` and `String` so literals can be styled directly.

use colored::{ColoredString, Colorize};

/// Convenience trait for applying color and style to text output.
pub trait GameStyle {
    fn speaker_style(&self) -> ColoredString;
    fn dialogue_style(&self) -> ColoredString;
    fn narration_style(&self) -> ColoredString;
    fn choice_style(&self) -> ColoredString;
    fn choice_index_style(&self) -> ColoredString;
    fn points_style(&self) -> ColoredString;
    fn level_style(&self) -> ColoredString;
    fn badge_style(&self) -> ColoredString;
    fn mission_style(&self) -> ColoredString;
    fn subheading_style(&self) -> ColoredString;
    fn section_style(&self) -> ColoredString;
    fn hint_style(&self) -> ColoredString;
    fn warning_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
}

impl GameStyle for &str {
    fn speaker_style(&self) -> ColoredString {
        self.bold().truecolor(13, 130, 60)
    }
    fn dialogue_style(&self) -> ColoredString {
        self.truecolor(230, 230, 230)
    }
    fn narration_style(&self) -> ColoredString {
        self.italic().truecolor(102, 208, 250)
    }
    fn choice_style(&self) -> ColoredString {
        self.truecolor(220, 180, 40)
    }
    fn choice_index_style(&self) -> ColoredString {
        self.bold().truecolor(223, 77, 10)
    }
    fn points_style(&self) -> ColoredString {
        self.bold().truecolor(150, 230, 30)
    }
    fn level_style(&self) -> ColoredString {
        self.truecolor(220, 40, 220).underline()
    }
    fn badge_style(&self) -> ColoredString {
        self.truecolor(230, 230, 30)
    }
    fn mission_style(&self) -> ColoredString {
        self.italic().truecolor(110, 220, 110)
    }
    fn subheading_style(&self) -> ColoredString {
        self.underline()
    }
    fn section_style(&self) -> ColoredString {
        let bracketed = format!("[{self}]");
        bracketed.truecolor(75, 80, 75)
    }
    fn hint_style(&self) -> ColoredString {
        self.dimmed()
    }
    fn warning_style(&self) -> ColoredString {
        self.italic().truecolor(230, 150, 30)
    }
    fn error_style(&self) -> ColoredString {
        self.truecolor(230, 30, 30)
    }
}

impl GameStyle for String {
    fn speaker_style(&self) -> ColoredString {
        self.as_str().speaker_style()
    }
    fn dialogue_style(&self) -> ColoredString {
        self.as_str().dialogue_style()
    }
    fn narration_style(&self) -> ColoredString {
        self.as_str().narration_style()
    }
    fn choice_style(&self) -> ColoredString {
        self.as_str().choice_style()
    }
    fn choice_index_style(&self) -> ColoredString {
        self.as_str().choice_index_style()
    }
    fn points_style(&self) -> ColoredString {
        self.as_str().points_style()
    }
    fn level_style(&self) -> ColoredString {
        self.as_str().level_style()
    }
    fn badge_style(&self) -> ColoredString {
        self.as_str().badge_style()
    }
    fn mission_style(&self) -> ColoredString {
        self.as_str().mission_style()
    }
    fn subheading_style(&self) -> ColoredString {
        self.as_str().subheading_style()
    }
    fn section_style(&self) -> ColoredString {
        self.as_str().section_style()
    }
    fn hint_style(&self) -> ColoredString {
        self.as_str().hint_style()
    }
    fn warning_style(&self) -> ColoredString {
        self.as_str().warning_style()
    }
    fn error_style(&self) -> ColoredString {
        self.as_str().error_style()
    }
}
