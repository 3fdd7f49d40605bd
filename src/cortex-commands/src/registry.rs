//! Command registry for managing loaded commands.

use std::collections::HashMap;

use crate::command::Command;
use crate::loader::{CommandLoader, LoaderError};

/// Registry of custom commands, addressable by name or alias.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
    /// Map of aliases to command names.
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry and load commands from default directories.
    pub async fn load_default() -> Result<Self, LoaderError> {
        let mut registry = Self::new();
        registry.load_from_loader(&CommandLoader::new()).await?;
        Ok(registry)
    }

    /// Register every command `loader` finds.
    pub async fn load_from_loader(&mut self, loader: &CommandLoader) -> Result<(), LoaderError> {
        for cmd in loader.load_all().await? {
            self.register(cmd);
        }
        Ok(())
    }

    /// Register a command, replacing any command with the same name.
    pub fn register(&mut self, command: Command) {
        if let Some(previous) = self.commands.remove(&command.name) {
            for alias in &previous.config.aliases {
                self.aliases.remove(alias);
            }
        }
        for alias in &command.config.aliases {
            self.aliases.insert(alias.clone(), command.name.clone());
        }
        self.commands.insert(command.name.clone(), command);
    }

    /// Remove a command and its aliases.
    pub fn unregister(&mut self, name: &str) -> Option<Command> {
        let cmd = self.commands.remove(name)?;
        for alias in &cmd.config.aliases {
            self.aliases.remove(alias);
        }
        Some(cmd)
    }

    /// Get a command by name or alias. Names win over aliases.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|real_name| self.commands.get(real_name))
        })
    }

    /// Check whether a name or alias resolves to a command.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Remove all commands.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.aliases.clear();
    }

    /// Commands whose name or an alias starts with `prefix`, for completion.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&Command> {
        let prefix_lower = prefix.to_lowercase();

        let mut found: Vec<&Command> = self
            .commands
            .values()
            .filter(|cmd| {
                cmd.name.to_lowercase().starts_with(&prefix_lower)
                    || cmd
                        .config
                        .aliases
                        .iter()
                        .any(|a| a.to_lowercase().starts_with(&prefix_lower))
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

impl FromIterator<Command> for CommandRegistry {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        let mut registry = Self::new();
        for cmd in iter {
            registry.register(cmd);
        }
        registry
    }
}
