//! Detection of command substitution constructs.
//!
//! `$(...)`, backticks and process substitution run a nested command whose
//! text never reaches the segment-level allow/deny checks, so any of them
//! outside single quotes rejects the whole command.

use crate::command::QuoteState;

/// Kind of substitution construct found in a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstitutionKind {
    /// `$(...)`
    Dollar,
    /// `` `...` ``
    Backtick,
    /// `<(...)`
    ProcessInput,
    /// `>(...)`
    ProcessOutput,
}

impl std::fmt::Display for SubstitutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dollar => write!(f, "$()"),
            Self::Backtick => write!(f, "backticks"),
            Self::ProcessInput => write!(f, "<()"),
            Self::ProcessOutput => write!(f, ">()"),
        }
    }
}

/// Find the first substitution construct outside single quotes.
///
/// Inside double quotes `$(...)` and backticks are still live while process
/// substitution is not. Backslash escapes are honoured outside single quotes.
pub fn find_command_substitution(command: &str) -> Option<SubstitutionKind> {
    let chars: Vec<char> = command.chars().collect();
    let mut state = QuoteState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match state {
            QuoteState::InSingleQuote => {
                if c == '\'' {
                    state = QuoteState::Normal;
                }
            }
            QuoteState::Normal | QuoteState::InDoubleQuote => {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == '$' && next == Some('(') {
                    return Some(SubstitutionKind::Dollar);
                }
                if c == '`' {
                    return Some(SubstitutionKind::Backtick);
                }
                if state == QuoteState::Normal && next == Some('(') {
                    match c {
                        '<' => return Some(SubstitutionKind::ProcessInput),
                        '>' => return Some(SubstitutionKind::ProcessOutput),
                        _ => {}
                    }
                }

                if c == '"' {
                    state = if state == QuoteState::InDoubleQuote {
                        QuoteState::Normal
                    } else {
                        QuoteState::InDoubleQuote
                    };
                } else if c == '\'' && state == QuoteState::Normal {
                    state = QuoteState::InSingleQuote;
                }
            }
        }

        i += 1;
    }

    None
}

/// True if `command` contains any substitution construct.
pub fn detect_command_substitution(command: &str) -> bool {
    find_command_substitution(command).is_some()
}
