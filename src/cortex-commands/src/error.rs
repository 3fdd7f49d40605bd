//! Errors raised while resolving a command template.

use cortex_execpolicy::PolicyError;
use thiserror::Error;

/// Fatal outcomes of [`ShellProcessor::process`](crate::ShellProcessor::process).
///
/// Non-zero exit codes and signals are not errors; they are folded into the
/// resolved text.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A `!{` was never closed. Nothing was executed.
    #[error("unclosed shell injection starting at offset {offset}")]
    UnclosedInjection { offset: usize },

    /// The template needs a policy but none was wired into the context.
    #[error("no command policy is configured; shell injections cannot be evaluated")]
    ConfigurationMissing,

    /// The policy source holds a malformed entry for the shell tool.
    #[error("invalid command policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    /// Some commands are not allow-listed. Approving them in the session
    /// allowlist and processing again will let them run.
    #[error("confirmation required for: {}", commands.join(", "))]
    ConfirmationRequired { commands: Vec<String> },

    /// A command is blocked and cannot be approved.
    #[error("blocked shell command '{command}': {reason}")]
    HardDenial { command: String, reason: String },

    /// A command could not be started.
    #[error("failed to start shell command '{command}': {message}")]
    ExecutionFailure { command: String, message: String },
}

impl ProcessError {
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, Self::ConfirmationRequired { .. })
    }

    /// Commands the caller may offer for approval, if any.
    pub fn commands_to_confirm(&self) -> &[String] {
        match self {
            Self::ConfirmationRequired { commands } => commands,
            _ => &[],
        }
    }
}
