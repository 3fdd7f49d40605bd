//! Per-session command allowlist.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

/// Exact commands the user approved for the rest of a session.
///
/// Clones share one underlying set, so an approval recorded through any
/// handle is visible to every evaluation in the session. The set only grows
/// and is never written to disk.
#[derive(Debug, Clone, Default)]
pub struct SessionAllowlist {
    commands: Arc<RwLock<HashSet<String>>>,
}

impl SessionAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve one fully resolved command. Returns false if already present.
    pub fn allow(&self, command: impl AsRef<str>) -> bool {
        let command = command.as_ref().trim();
        if command.is_empty() {
            return false;
        }
        let inserted = self.commands.write().insert(command.to_string());
        if inserted {
            info!(command, "Command approved for this session");
        }
        inserted
    }

    /// Approve several commands at once.
    pub fn allow_all<I, S>(&self, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for command in commands {
            self.allow(command);
        }
    }

    /// Exact-match lookup on the trimmed command text.
    pub fn contains(&self, command: &str) -> bool {
        self.commands.read().contains(command.trim())
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Sorted copy of the current entries.
    pub fn snapshot(&self) -> Vec<String> {
        let mut commands: Vec<String> = self.commands.read().iter().cloned().collect();
        commands.sort();
        commands
    }
}

impl<S: AsRef<str>> FromIterator<S> for SessionAllowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let allowlist = Self::new();
        allowlist.allow_all(iter);
        allowlist
    }
}
