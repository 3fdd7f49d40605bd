//! Parsed allow/block entries and the per-evaluation policy snapshot.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::command::{ChainSegment, command_root};
use crate::config::PolicySource;
use crate::error::PolicyError;

/// Name under which the shell tool appears in allow/block lists.
pub const SHELL_TOOL_NAME: &str = "Execute";

/// One allow or block list entry.
///
/// Entries are written as `Tool` (every command) or `Tool(<command>)`. A
/// single-word command matches by root program; anything longer must match
/// the whole segment text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolicyEntry {
    Wildcard { tool: String },
    RootMatch { tool: String, root: String },
    ExactMatch { tool: String, command: String },
}

impl PolicyEntry {
    pub fn tool(&self) -> &str {
        match self {
            Self::Wildcard { tool }
            | Self::RootMatch { tool, .. }
            | Self::ExactMatch { tool, .. } => tool,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }

    /// Whether this entry covers `segment`. The tool name is not checked.
    pub fn matches(&self, segment: &ChainSegment) -> bool {
        match self {
            Self::Wildcard { .. } => true,
            Self::RootMatch { root, .. } => segment.root.as_deref() == Some(root.as_str()),
            Self::ExactMatch { command, .. } => segment.text == *command,
        }
    }
}

impl FromStr for PolicyEntry {
    type Err = PolicyError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let trimmed = entry.trim();

        let Some(open) = trimmed.find('(') else {
            if trimmed.is_empty() {
                return Err(PolicyError::invalid_entry(entry, "empty entry"));
            }
            return Ok(Self::Wildcard {
                tool: trimmed.to_string(),
            });
        };

        let tool = trimmed[..open].trim();
        if tool.is_empty() {
            return Err(PolicyError::invalid_entry(entry, "missing tool name"));
        }
        let Some(inner) = trimmed[open + 1..].strip_suffix(')') else {
            return Err(PolicyError::invalid_entry(entry, "missing closing ')'"));
        };
        let inner = inner.trim();
        if inner.is_empty() {
            return Err(PolicyError::invalid_entry(entry, "empty command"));
        }

        let tool = tool.to_string();
        if inner.contains(char::is_whitespace) {
            Ok(Self::ExactMatch {
                tool,
                command: inner.to_string(),
            })
        } else {
            let root = command_root(inner)
                .ok_or_else(|| PolicyError::invalid_entry(entry, "no program name"))?;
            Ok(Self::RootMatch { tool, root })
        }
    }
}

impl fmt::Display for PolicyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard { tool } => write!(f, "{tool}"),
            Self::RootMatch { tool, root } => write!(f, "{tool}({root})"),
            Self::ExactMatch { tool, command } => write!(f, "{tool}({command})"),
        }
    }
}

/// Allow and block entries for one tool, parsed once per evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPolicy {
    allowed: Vec<PolicyEntry>,
    blocked: Vec<PolicyEntry>,
}

impl CommandPolicy {
    /// A policy with no entries: everything allowed in default-allow mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw entries, keeping only the ones that name `tool`.
    pub fn from_entries<A, B, S>(tool: &str, allowed: A, blocked: B) -> Result<Self, PolicyError>
    where
        A: IntoIterator<Item = S>,
        B: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            allowed: parse_for_tool(tool, allowed)?,
            blocked: parse_for_tool(tool, blocked)?,
        })
    }

    /// Snapshot the shell-tool entries of `source`.
    pub fn from_source(source: &dyn PolicySource) -> Result<Self, PolicyError> {
        Self::from_entries(
            SHELL_TOOL_NAME,
            source.allowed_tools(),
            source.blocked_tools(),
        )
    }

    pub fn allowed(&self) -> &[PolicyEntry] {
        &self.allowed
    }

    pub fn blocked(&self) -> &[PolicyEntry] {
        &self.blocked
    }

    /// The tool is blocked outright.
    pub fn is_tool_disabled(&self) -> bool {
        self.blocked.iter().any(PolicyEntry::is_wildcard)
    }

    /// At least one allow entry exists, so unmatched commands are not
    /// implicitly allowed in default-allow mode.
    pub fn has_allowlist(&self) -> bool {
        !self.allowed.is_empty()
    }

    /// First block entry covering `segment`.
    pub fn blocked_by(&self, segment: &ChainSegment) -> Option<&PolicyEntry> {
        self.blocked.iter().find(|entry| entry.matches(segment))
    }

    /// First allow entry covering `segment`.
    pub fn allowed_by(&self, segment: &ChainSegment) -> Option<&PolicyEntry> {
        self.allowed.iter().find(|entry| entry.matches(segment))
    }
}

fn parse_for_tool<I, S>(tool: &str, entries: I) -> Result<Vec<PolicyEntry>, PolicyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for raw in entries {
        let raw = raw.as_ref();
        match raw.parse::<PolicyEntry>() {
            Ok(entry) if entry.tool() == tool => parsed.push(entry),
            Ok(_) => {}
            // A broken entry for our own tool could silently widen access.
            Err(e) if raw.trim().split('(').next().map(str::trim) == Some(tool) => return Err(e),
            Err(e) => debug!(error = %e, "Ignoring malformed entry for another tool"),
        }
    }
    Ok(parsed)
}
