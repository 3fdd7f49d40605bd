//! Splitting command lines into chain segments.
//!
//! This is deliberately not a shell parser. It only knows enough about
//! quoting to find the top-level `;`, `|`, `&`, `&&` and `||` operators and
//! the program each resulting segment runs.

/// Quoting state while scanning a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuoteState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
}

/// One sub-command of a chained command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSegment {
    /// Whitespace-trimmed text of the segment.
    pub text: String,
    /// Program name the segment invokes, without any directory prefix.
    pub root: Option<String>,
}

impl ChainSegment {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into().trim().to_string();
        let root = command_root(&text);
        Self { text, root }
    }
}

/// Split `command` at top-level chain operators.
///
/// Operators inside single or double quotes, or escaped with a backslash,
/// are kept as text. An unquoted newline separates commands like `;`.
/// Redirections such as `2>&1` and `&>file` are not treated as operators.
pub fn split_commands(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut state = QuoteState::Normal;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            QuoteState::InSingleQuote => {
                current.push(c);
                if c == '\'' {
                    state = QuoteState::Normal;
                }
            }
            QuoteState::InDoubleQuote => {
                current.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else if c == '"' {
                    state = QuoteState::Normal;
                }
            }
            QuoteState::Normal => match c {
                '\\' => {
                    current.push(c);
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                '\'' => {
                    state = QuoteState::InSingleQuote;
                    current.push(c);
                }
                '"' => {
                    state = QuoteState::InDoubleQuote;
                    current.push(c);
                }
                ';' | '\n' => flush(&mut current, &mut segments),
                '&' if current.ends_with(['>', '<']) || chars.peek() == Some(&'>') => {
                    current.push(c);
                }
                '&' | '|' => {
                    if chars.peek() == Some(&c) {
                        chars.next();
                    }
                    flush(&mut current, &mut segments);
                }
                _ => current.push(c),
            },
        }
    }

    flush(&mut current, &mut segments);
    segments
}

fn flush(current: &mut String, segments: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Program name invoked by a single segment.
///
/// The first whitespace-delimited token is taken (or the whole quoted
/// token if it starts with a quote) and any `/` or `\` directory prefix
/// is stripped.
pub fn command_root(segment: &str) -> Option<String> {
    let trimmed = segment.trim();
    let token = if let Some(rest) = trimmed.strip_prefix('"') {
        rest.split('"').next()
    } else if let Some(rest) = trimmed.strip_prefix('\'') {
        rest.split('\'').next()
    } else {
        trimmed.split_whitespace().next()
    }?;

    let root = token.rsplit(['/', '\\']).next()?;
    if root.is_empty() {
        None
    } else {
        Some(root.to_string())
    }
}

/// Root program of every chain segment, in order.
pub fn get_command_roots(command: &str) -> Vec<String> {
    split_commands(command)
        .iter()
        .filter_map(|segment| command_root(segment))
        .collect()
}

/// Split `command` into segments with their roots.
pub fn parse_segments(command: &str) -> Vec<ChainSegment> {
    split_commands(command)
        .into_iter()
        .map(ChainSegment::new)
        .collect()
}
