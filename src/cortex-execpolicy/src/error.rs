//! Error types for the policy engine.

use thiserror::Error;

/// Errors that can occur while loading a command policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A policy entry could not be parsed.
    #[error("invalid policy entry '{entry}': {reason}")]
    InvalidEntry { entry: String, reason: String },

    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] toml::de::Error),
}

impl PolicyError {
    pub(crate) fn invalid_entry(entry: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }
}
