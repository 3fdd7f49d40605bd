//! Turning a command invocation into prompt text.

use crate::command::{Command, hints};
use crate::error::ProcessError;
use crate::processor::{ProcessContext, ShellProcessor};
use crate::template::ARGS_PLACEHOLDER;

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The command that was executed.
    pub command_name: String,

    /// The fully resolved prompt.
    pub prompt: String,
}

/// Executor for custom commands.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    processor: ShellProcessor,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processor(processor: ShellProcessor) -> Self {
        Self { processor }
    }

    /// Resolve `command` with the arguments and collaborators in `context`.
    ///
    /// A template that never mentions `{{args}}` still receives its
    /// arguments: the raw invocation is appended after a blank line.
    pub async fn execute(
        &self,
        command: &Command,
        context: &ProcessContext,
    ) -> Result<ExecutionResult, ProcessError> {
        let mut prompt = self.processor.process(&command.template, context).await?;

        let arguments = context.arguments.trim();
        if !command.template.contains(ARGS_PLACEHOLDER) && !arguments.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&format_invocation(&command.name, arguments));
        }

        Ok(ExecutionResult {
            command_name: command.name.clone(),
            prompt,
        })
    }

    pub fn get_hints(&self, command: &Command) -> Vec<String> {
        hints(&command.template)
    }
}

/// Parse a command invocation string.
///
/// Format: `/command_name arguments...`
///
/// Returns (command_name, arguments) or None if not a valid invocation.
pub fn parse_invocation(input: &str) -> Option<(&str, &str)> {
    let without_slash = input.trim().strip_prefix('/')?;
    let mut parts = without_slash.splitn(2, char::is_whitespace);

    let command_name = parts.next().filter(|name| !name.is_empty())?;
    let arguments = parts.next().unwrap_or("").trim();

    Some((command_name, arguments))
}

/// Rebuild the text a user typed to invoke `name`.
pub fn format_invocation(name: &str, arguments: &str) -> String {
    if arguments.is_empty() {
        format!("/{name}")
    } else {
        format!("/{name} {arguments}")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cortex_execpolicy::PolicyConfig;
    use cortex_shell::ExecutionResult as ShellResult;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::command::CommandConfig;
    use crate::processor::CommandRunner;

    struct EchoRunner;

    #[async_trait]
    impl CommandRunner for EchoRunner {
        async fn run(&self, command: &str, _cwd: &std::path::Path, _cancel: CancellationToken) -> ShellResult {
            ShellResult {
                output: format!("<{command}>"),
                exit_code: Some(0),
                ..Default::default()
            }
        }
    }

    fn make_command(name: &str, template: &str) -> Command {
        Command::new(
            name,
            CommandConfig::default(),
            template,
            PathBuf::from("/test/cmd.md"),
        )
    }

    fn context(arguments: &str) -> ProcessContext {
        ProcessContext::new(arguments, "/work")
            .with_policy(Arc::new(PolicyConfig::new().with_allowed("Execute(git)")))
            .with_runner(Arc::new(EchoRunner))
    }

    #[tokio::test]
    async fn test_execute_substitutes_arguments() {
        let cmd = make_command("echo", "Echo: {{args}}");
        let result = Executor::new().execute(&cmd, &context("hello world")).await.unwrap();

        assert_eq!(result.command_name, "echo");
        assert_eq!(result.prompt, "Echo: hello world");
    }

    #[tokio::test]
    async fn test_execute_appends_unplaced_arguments() {
        let cmd = make_command("review", "Review the staged changes.");
        let result = Executor::new().execute(&cmd, &context("  focus on tests ")).await.unwrap();

        assert_eq!(
            result.prompt,
            "Review the staged changes.\n\n/review focus on tests"
        );
    }

    #[tokio::test]
    async fn test_execute_without_arguments() {
        let cmd = make_command("review", "Review the staged changes.");
        let result = Executor::new().execute(&cmd, &context("")).await.unwrap();
        assert_eq!(result.prompt, "Review the staged changes.");
    }

    #[tokio::test]
    async fn test_execute_with_injection() {
        let cmd = make_command("log", "Recent: !{git log -n {{args}}}");
        let result = Executor::new().execute(&cmd, &context("3")).await.unwrap();
        assert_eq!(result.prompt, "Recent: <git log -n 3>");
    }

    #[tokio::test]
    async fn test_execute_surfaces_confirmation() {
        let cmd = make_command("build", "!{make}");
        let err = Executor::new().execute(&cmd, &context("")).await.unwrap_err();
        assert_eq!(err.commands_to_confirm(), ["make"]);
    }

    #[test]
    fn test_get_hints() {
        let cmd = make_command("cmd", "All: {{args}}");
        assert_eq!(Executor::new().get_hints(&cmd), vec!["{{args}}"]);
    }

    #[test]
    fn test_parse_invocation() {
        assert_eq!(parse_invocation("/build --release"), Some(("build", "--release")));
        assert_eq!(parse_invocation("  /test  "), Some(("test", "")));
        assert_eq!(parse_invocation("/fix   a  b "), Some(("fix", "a  b")));
        assert!(parse_invocation("not a command").is_none());
        assert!(parse_invocation("/").is_none());
    }

    #[test]
    fn test_format_invocation() {
        assert_eq!(format_invocation("help", ""), "/help");
        assert_eq!(format_invocation("build", "--release"), "/build --release");
    }
}
