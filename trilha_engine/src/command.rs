//! Command module
//!
//! Describes the commands understood by the terminal host.
use variantly::Variantly;

/// Commands that can be entered at the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum Command {
    /// Continue the conversation (or finish revealing the current line).
    Advance,
    /// Pick a choice by its zero-based index.
    Choose(usize),
    Export(String),
    Help,
    Import(String),
    Npcs,
    Quit,
    Reset,
    Skip,
    Speed(String),
    Status,
    Talk(String),
    Unknown(String),
}

/// Parses an input line into a `Command`.
///
/// Choices are shown to the player numbered from 1, so `"1"` selects index 0.
pub fn parse_command(input: &str) -> Command {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        [] | ["next" | "n" | "continue" | "c"] => Command::Advance,
        [number] if number.chars().all(|ch| ch.is_ascii_digit()) => match number.parse::<usize>() {
            Ok(n) if n > 0 => Command::Choose(n - 1),
            _ => Command::Unknown(input.trim().to_string()),
        },
        ["talk" | "falar", "to" | "with" | "com", npc] | ["talk" | "falar", npc] => Command::Talk((*npc).to_string()),
        ["skip" | "s"] => Command::Skip,
        ["status" | "st"] => Command::Status,
        ["npcs" | "who"] => Command::Npcs,
        ["export", file] => Command::Export((*file).to_string()),
        ["import", file] => Command::Import((*file).to_string()),
        ["reset"] => Command::Reset,
        ["speed", speed] => Command::Speed((*speed).to_lowercase()),
        ["help" | "?" | "ajuda"] => Command::Help,
        ["quit" | "exit" | "sair"] => Command::Quit,
        _ => Command::Unknown(input.trim().to_string()),
    }
}

/// Command summaries shown by `help`.
pub const HELP_ENTRIES: &[(&str, &str)] = &[
    ("talk <npc>", "start a conversation"),
    ("next / <enter>", "continue the conversation"),
    ("skip", "show the current line in full"),
    ("<number>", "pick one of the offered choices"),
    ("npcs", "list who you can talk to"),
    ("status", "show points, level, missions and badges"),
    ("speed <slow|normal|fast|instant>", "change the text speed"),
    ("export <file>", "write a backup of your progress"),
    ("import <file>", "restore progress from a backup"),
    ("reset", "start over with fresh progress"),
    ("quit", "leave the game"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_and_next_advance() {
        assert_eq!(parse_command(""), Command::Advance);
        assert_eq!(parse_command("   \n"), Command::Advance);
        assert_eq!(parse_command("next"), Command::Advance);
    }

    #[test]
    fn numbers_select_one_based_choices() {
        assert_eq!(parse_command("1"), Command::Choose(0));
        assert_eq!(parse_command(" 3 "), Command::Choose(2));
        assert!(parse_command("0").is_unknown());
        assert!(parse_command("99999999999999999999999").is_unknown());
    }

    #[test]
    fn talk_accepts_optional_preposition() {
        assert_eq!(parse_command("talk ana"), Command::Talk("ana".into()));
        assert_eq!(parse_command("talk to ana"), Command::Talk("ana".into()));
        assert_eq!(parse_command("falar com ana"), Command::Talk("ana".into()));
    }

    #[test]
    fn file_and_setting_commands_take_arguments() {
        assert_eq!(parse_command("export backup.json"), Command::Export("backup.json".into()));
        assert_eq!(parse_command("import backup.json"), Command::Import("backup.json".into()));
        assert_eq!(parse_command("speed FAST"), Command::Speed("fast".into()));
        assert!(parse_command("export").is_unknown());
    }
}
