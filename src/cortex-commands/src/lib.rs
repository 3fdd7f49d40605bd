//! Custom command system for Cortex CLI.
//!
//! Commands are markdown files whose body is a prompt template. Templates
//! may refer to the invocation's arguments and may embed shell commands
//! whose output is spliced into the prompt.
//!
//! # Command File Format
//!
//! ```markdown
//! ---
//! description: "Explain recent changes"
//! aliases: [why]
//! ---
//!
//! Explain these changes with a focus on {{args}}:
//!
//! !{git diff --stat {{args}}}
//! ```
//!
//! - `{{args}}` outside `!{...}` is replaced with the raw argument string.
//! - `!{...}` runs its content through the host shell; `{{args}}` inside it
//!   is replaced with the shell-escaped argument string. Every command is
//!   checked against the command policy before any of them runs.
//!
//! # Search Paths
//!
//! Commands are loaded from:
//! 1. `.cortex/command/` (project-local)
//! 2. `<config dir>/Cortex/command/` (global)
//!
//! ```rust,ignore
//! use cortex_commands::{CommandRegistry, Executor, ProcessContext, parse_invocation};
//!
//! let registry = CommandRegistry::load_default().await?;
//! let (name, args) = parse_invocation("/why auth").unwrap();
//! let ctx = ProcessContext::new(args, cwd).with_policy(policy);
//! let result = Executor::new().execute(registry.get(name).unwrap(), &ctx).await?;
//! ```

mod command;
mod error;
mod executor;
mod loader;
mod processor;
mod registry;
mod template;

pub use command::{Command, CommandConfig, CommandError, hints};
pub use error::ProcessError;
pub use executor::{ExecutionResult, Executor, format_invocation, parse_invocation};
pub use loader::{CommandLoader, LoaderError, PROJECT_COMMAND_DIR, default_search_dirs};
pub use processor::{CommandRunner, ProcessContext, ShellProcessor, ShellRunner};
pub use registry::CommandRegistry;
pub use template::{
    ARGS_PLACEHOLDER, InjectionSpan, SHELL_INJECTION_TRIGGER, extract_injections,
    has_shell_injections,
};

/// Synchronous loader utilities.
pub mod sync {
    pub use crate::loader::sync::*;
}
