//! Template resolution with argument substitution and shell injection.
//!
//! A template is resolved in three passes so that nothing runs unless every
//! command in it may run:
//!
//! 1. scan every `!{...}` span and substitute escaped arguments into it;
//! 2. check every resolved command against the policy;
//! 3. execute the commands in template order and splice in their output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cortex_execpolicy::{CommandPolicy, PolicySource, SessionAllowlist, check_command_permissions};
use cortex_shell::{
    ArgumentEscaper, ExecutionResult, OutputChunk, ShellExecutionService, shell_config,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ProcessError;
use crate::template::{ARGS_PLACEHOLDER, InjectionSpan, extract_injections, has_shell_injections};

/// Runs one approved command.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path, cancel: CancellationToken) -> ExecutionResult;
}

/// [`CommandRunner`] backed by the host shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    service: ShellExecutionService,
    output: Option<mpsc::Sender<OutputChunk>>,
}

impl ShellRunner {
    pub fn new(service: ShellExecutionService) -> Self {
        Self {
            service,
            output: None,
        }
    }

    /// Forward output chunks to `sender` while commands run.
    #[must_use]
    pub fn with_output(mut self, sender: mpsc::Sender<OutputChunk>) -> Self {
        self.output = Some(sender);
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path, cancel: CancellationToken) -> ExecutionResult {
        self.service
            .execute(command, cwd, self.output.clone(), cancel)
            .result
            .await
    }
}

/// Everything one `process` call needs from its caller.
#[derive(Clone)]
pub struct ProcessContext {
    /// Raw argument string of the invocation.
    pub arguments: String,
    pub working_dir: PathBuf,
    /// Commands approved earlier in this session.
    pub session_allowlist: SessionAllowlist,
    /// Allow and block lists. Required once a template contains `!{`.
    pub policy: Option<Arc<dyn PolicySource>>,
    pub runner: Arc<dyn CommandRunner>,
    /// Stops the running command; later ones resolve as aborted unstarted.
    pub cancel: CancellationToken,
}

impl ProcessContext {
    pub fn new(arguments: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            arguments: arguments.into(),
            working_dir: working_dir.into(),
            session_allowlist: SessionAllowlist::new(),
            policy: None,
            runner: Arc::new(ShellRunner::default()),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn PolicySource>) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_session_allowlist(mut self, allowlist: SessionAllowlist) -> Self {
        self.session_allowlist = allowlist;
        self
    }

    #[must_use]
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl std::fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessContext")
            .field("arguments", &self.arguments)
            .field("working_dir", &self.working_dir)
            .field("session_allowlist", &self.session_allowlist)
            .field("has_policy", &self.policy.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolves `{{args}}` placeholders and `!{...}` shell injections.
#[derive(Clone)]
pub struct ShellProcessor {
    escaper: Arc<dyn ArgumentEscaper>,
}

impl Default for ShellProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShellProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellProcessor").finish_non_exhaustive()
    }
}

impl ShellProcessor {
    /// Processor escaping arguments for the host shell.
    pub fn new() -> Self {
        Self::with_escaper(Arc::new(shell_config().clone()))
    }

    pub fn with_escaper(escaper: Arc<dyn ArgumentEscaper>) -> Self {
        Self { escaper }
    }

    /// Resolve `template` into its final text.
    ///
    /// Outside injections `{{args}}` becomes the raw argument string; inside
    /// them it becomes the escaped one. Errors are raised before anything
    /// runs, except [`ProcessError::ExecutionFailure`], which discards the
    /// output of commands that already ran.
    pub async fn process(
        &self,
        template: &str,
        context: &ProcessContext,
    ) -> Result<String, ProcessError> {
        if !has_shell_injections(template) {
            return Ok(template.replace(ARGS_PLACEHOLDER, &context.arguments));
        }

        let source = context
            .policy
            .as_deref()
            .ok_or(ProcessError::ConfigurationMissing)?;
        let policy = CommandPolicy::from_source(source)?;

        let escaped = self.escaper.escape(&context.arguments);
        let spans = extract_injections(template)?;
        let commands: Vec<String> = spans
            .iter()
            .map(|span| span.command.replace(ARGS_PLACEHOLDER, &escaped))
            .collect();
        debug!(spans = spans.len(), "Extracted shell injections");

        authorize(&commands, &policy, &context.session_allowlist)?;

        let mut outputs = Vec::with_capacity(commands.len());
        for command in &commands {
            if command.is_empty() {
                outputs.push(String::new());
                continue;
            }
            let result = context
                .runner
                .run(command, &context.working_dir, context.cancel.clone())
                .await;
            outputs.push(render_result(command, result)?);
        }

        Ok(assemble(template, &spans, outputs, &context.arguments))
    }
}

/// Check every command before any runs.
fn authorize(
    commands: &[String],
    policy: &CommandPolicy,
    session: &SessionAllowlist,
) -> Result<(), ProcessError> {
    let mut pending: Vec<String> = Vec::new();

    for command in commands.iter().filter(|c| !c.is_empty()) {
        let verdict = check_command_permissions(command, policy, Some(session));
        if verdict.all_allowed {
            continue;
        }
        if verdict.is_hard_denial {
            // Report the segment that failed hard, not an earlier soft miss.
            let reason = verdict
                .hard_denial
                .map(|denial| denial.reason)
                .or(verdict.block_reason)
                .unwrap_or_else(|| "blocked by configuration".to_string());
            warn!(command = %command, reason = %reason, "Shell injection denied");
            return Err(ProcessError::HardDenial {
                command: command.clone(),
                reason,
            });
        }
        for disallowed in verdict.disallowed_commands {
            if !pending.contains(&disallowed) {
                pending.push(disallowed);
            }
        }
    }

    if pending.is_empty() {
        Ok(())
    } else {
        debug!(commands = ?pending, "Shell injections need confirmation");
        Err(ProcessError::ConfirmationRequired { commands: pending })
    }
}

/// Output plus a note on how the command ended.
fn render_result(command: &str, result: ExecutionResult) -> Result<String, ProcessError> {
    let mut text = result.output;

    if let Some(code) = result.exit_code.filter(|code| *code != 0) {
        text.push_str(&format!("\n[Shell command exited with code {code}]"));
    } else if let Some(signal) = result.signal {
        text.push_str(&format!("\n[Shell command terminated by signal {signal}]"));
    } else if result.aborted {
        text.push_str("\n[Shell command aborted]");
    } else if let Some(message) = result.spawn_error {
        return Err(ProcessError::ExecutionFailure {
            command: command.to_string(),
            message,
        });
    }

    Ok(text)
}

fn assemble(
    template: &str,
    spans: &[InjectionSpan],
    outputs: Vec<String>,
    arguments: &str,
) -> String {
    let mut resolved = String::with_capacity(template.len());
    let mut cursor = 0;

    for (span, output) in spans.iter().zip(outputs) {
        resolved.push_str(&template[cursor..span.start].replace(ARGS_PLACEHOLDER, arguments));
        resolved.push_str(&output);
        cursor = span.end;
    }
    resolved.push_str(&template[cursor..].replace(ARGS_PLACEHOLDER, arguments));

    resolved
}
