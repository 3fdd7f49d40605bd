//! Policy configuration.

use serde::{Deserialize, Serialize};

use crate::entry::CommandPolicy;
use crate::error::PolicyError;

/// Where allow and block lists come from.
///
/// Entries are raw strings such as `"Execute"` or `"Execute(git status)"`;
/// they are parsed into a [`CommandPolicy`] once per evaluation.
pub trait PolicySource: Send + Sync {
    fn allowed_tools(&self) -> Vec<String>;
    fn blocked_tools(&self) -> Vec<String>;
}

/// Allow and block lists as stored in settings.
///
/// ```toml
/// allowed_tools = ["Execute(git)", "Execute(ls -la)"]
/// blocked_tools = ["Execute(rm)"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Entries that are allowed without confirmation.
    pub allowed_tools: Vec<String>,

    /// Entries that are never allowed.
    pub blocked_tools: Vec<String>,
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(s)?)
    }

    /// Builder: add an allow entry.
    #[must_use]
    pub fn with_allowed(mut self, entry: impl Into<String>) -> Self {
        self.allowed_tools.push(entry.into());
        self
    }

    /// Builder: add a block entry.
    #[must_use]
    pub fn with_blocked(mut self, entry: impl Into<String>) -> Self {
        self.blocked_tools.push(entry.into());
        self
    }

    /// Parse the shell-tool entries.
    pub fn compile(&self) -> Result<CommandPolicy, PolicyError> {
        CommandPolicy::from_source(self)
    }
}

impl PolicySource for PolicyConfig {
    fn allowed_tools(&self) -> Vec<String> {
        self.allowed_tools.clone()
    }

    fn blocked_tools(&self) -> Vec<String> {
        self.blocked_tools.clone()
    }
}
