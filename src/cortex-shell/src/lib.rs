//! Cortex Shell - host shell invocation for user-defined commands.
//!
//! Three pieces live here:
//! - [`ShellInvocationConfig`] - which executable runs a command string, and
//!   with which leading arguments (`bash -c`, `cmd.exe /d /s /c`).
//! - [`escape`] - quoting a raw argument so it can be spliced into a command
//!   line for that shell.
//! - [`ShellExecutionService`] - spawning one command, streaming its output,
//!   and tearing it down on cancellation.
//!
//! ```rust,ignore
//! use cortex_shell::ShellExecutionService;
//! use tokio_util::sync::CancellationToken;
//!
//! let service = ShellExecutionService::new();
//! let result = service.run("git status --short", cwd, CancellationToken::new()).await;
//! println!("{}", result.output);
//! ```

mod exec;
mod shell;

pub use exec::{
    ExecutionResult, KILL_GRACE_PERIOD, OUTPUT_DRAIN_WINDOW, OutputChunk, ShellExecution,
    ShellExecutionService,
};
pub use shell::{
    ArgumentEscaper, DEFAULT_WINDOWS_SHELL, POSIX_SHELL, ShellInvocationConfig, ShellPlatform,
    WINDOWS_SHELL_ENV, escape, escape_with, quote_posix, quote_windows, shell_config,
};

/// Re-exported so callers can build tokens without naming tokio-util.
pub use tokio_util::sync::CancellationToken;
