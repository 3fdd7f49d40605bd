//! Locating `!{...}` shell injections inside a template.

use crate::error::ProcessError;

/// Replaced by the invocation's argument string.
pub const ARGS_PLACEHOLDER: &str = "{{args}}";

/// Opens a shell injection. The span ends at the matching `}`.
pub const SHELL_INJECTION_TRIGGER: &str = "!{";

/// One `!{...}` region of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionSpan {
    /// Content between the delimiters, whitespace-trimmed.
    pub command: String,
    /// Byte offset of the `!`.
    pub start: usize,
    /// Byte offset just past the closing `}`.
    pub end: usize,
}

impl InjectionSpan {
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InSingleQuote,
    InDoubleQuote,
}

/// Whether `template` contains any shell injection trigger.
pub fn has_shell_injections(template: &str) -> bool {
    template.contains(SHELL_INJECTION_TRIGGER)
}

/// Every injection span in `template`, in order.
///
/// Braces inside single or double quotes do not count towards nesting. The
/// whole template is scanned before returning, so an unclosed span fails
/// even when earlier spans were well formed.
pub fn extract_injections(template: &str) -> Result<Vec<InjectionSpan>, ProcessError> {
    let mut spans = Vec::new();
    let mut index = 0;

    while let Some(found) = template[index..].find(SHELL_INJECTION_TRIGGER) {
        let start = index + found;
        let body = start + SHELL_INJECTION_TRIGGER.len();
        let close = find_closing_brace(template, body)
            .ok_or(ProcessError::UnclosedInjection { offset: start })?;

        spans.push(InjectionSpan {
            command: template[body..close].trim().to_string(),
            start,
            end: close + 1,
        });
        index = close + 1;
    }

    Ok(spans)
}

/// Offset of the `}` that returns depth to zero, starting at depth 1.
fn find_closing_brace(template: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut state = ScanState::Normal;
    let mut chars = template[from..].char_indices();

    while let Some((i, c)) = chars.next() {
        match state {
            ScanState::Normal => match c {
                '\\' => {
                    chars.next();
                }
                '\'' => state = ScanState::InSingleQuote,
                '"' => state = ScanState::InDoubleQuote,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(from + i);
                    }
                }
                _ => {}
            },
            ScanState::InSingleQuote => {
                if c == '\'' {
                    state = ScanState::Normal;
                }
            }
            ScanState::InDoubleQuote => match c {
                '\\' => {
                    chars.next();
                }
                '"' => state = ScanState::Normal,
                _ => {}
            },
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(template: &str) -> Vec<String> {
        extract_injections(template)
            .unwrap()
            .into_iter()
            .map(|s| s.command)
            .collect()
    }

    #[test]
    fn test_no_injections() {
        assert!(extract_injections("plain {{args}} text").unwrap().is_empty());
        assert!(!has_shell_injections("plain {{args}} text"));
    }

    #[test]
    fn test_offsets() {
        let template = "a !{ ls -l } b";
        let spans = extract_injections(template).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].command, "ls -l");
        assert_eq!(&template[spans[0].start..spans[0].end], "!{ ls -l }");
    }

    #[test]
    fn test_nested_braces() {
        assert_eq!(
            commands("!{find . -name '*.rs' -exec wc -l {} +}"),
            vec!["find . -name '*.rs' -exec wc -l {} +"]
        );
        assert_eq!(
            commands("!{echo ${HOME} {{args}}}"),
            vec!["echo ${HOME} {{args}}"]
        );
    }

    #[test]
    fn test_braces_in_quotes_are_ignored() {
        assert_eq!(commands("!{echo '}'}"), vec!["echo '}'"]);
        assert_eq!(commands(r#"!{echo "{" }"#), vec![r#"echo "{""#]);
        assert_eq!(commands(r#"!{echo "a\"}"}"#), vec![r#"echo "a\"}""#]);
    }

    #[test]
    fn test_multiple_and_empty_spans() {
        let spans = extract_injections("x !{} y !{git status}").unwrap();
        assert_eq!(spans.len(), 2);
        assert!(spans[0].is_empty());
        assert_eq!(spans[1].command, "git status");
    }

    #[test]
    fn test_unclosed_reports_offset() {
        let err = extract_injections("ok !{ls} then !{echo {oops}").unwrap_err();
        assert!(matches!(err, ProcessError::UnclosedInjection { offset: 14 }));

        let err = extract_injections("!{echo '}").unwrap_err();
        assert!(matches!(err, ProcessError::UnclosedInjection { offset: 0 }));
    }
}
