//! Command structure and parsing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::{ARGS_PLACEHOLDER, SHELL_INJECTION_TRIGGER, has_shell_injections};

/// Errors that can occur when working with commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid frontmatter format.
    #[error("Invalid frontmatter: {0}")]
    InvalidFrontmatter(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Configuration for a custom command, parsed from YAML frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Human-readable description of the command.
    #[serde(default)]
    pub description: Option<String>,

    /// Aliases for this command.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A custom command loaded from a markdown file.
#[derive(Debug, Clone)]
pub struct Command {
    /// Name of the command (filename without extension).
    pub name: String,

    /// Configuration from frontmatter.
    pub config: CommandConfig,

    /// Template content (after frontmatter).
    pub template: String,

    /// Path to the source file.
    pub source_path: PathBuf,
}

impl Command {
    pub fn new(
        name: impl Into<String>,
        config: CommandConfig,
        template: impl Into<String>,
        source_path: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            template: template.into(),
            source_path,
        }
    }

    /// Parse a command from file content.
    ///
    /// The content should be a markdown file with optional YAML frontmatter.
    pub fn parse(
        name: impl Into<String>,
        content: &str,
        source_path: PathBuf,
    ) -> Result<Self, CommandError> {
        let (config, template) = parse_frontmatter(content)?;
        Ok(Self::new(name, config, template, source_path))
    }

    pub fn description(&self) -> &str {
        self.config
            .description
            .as_deref()
            .unwrap_or("Custom command")
    }

    /// Placeholders and triggers used by this command's template.
    pub fn hints(&self) -> Vec<String> {
        hints(&self.template)
    }

    /// Whether the template places arguments itself.
    pub fn expects_arguments(&self) -> bool {
        self.template.contains(ARGS_PLACEHOLDER)
    }

    /// Whether resolving this command may run shell commands.
    pub fn has_shell_injections(&self) -> bool {
        has_shell_injections(&self.template)
    }
}

/// Parse YAML frontmatter from markdown content.
///
/// Frontmatter is delimited by `---` at the start and end.
/// Returns the parsed config and the remaining template content.
fn parse_frontmatter(content: &str) -> Result<(CommandConfig, String), CommandError> {
    let content = content.trim();

    let Some(rest) = content.strip_prefix("---") else {
        return Ok((CommandConfig::default(), content.to_string()));
    };

    let Some(end_pos) = rest.find("\n---") else {
        return Err(CommandError::InvalidFrontmatter(
            "Missing closing '---' delimiter".to_string(),
        ));
    };

    let yaml_content = rest[..end_pos].trim();
    let template = rest[end_pos + 4..].trim();

    let config: CommandConfig = if yaml_content.is_empty() {
        CommandConfig::default()
    } else {
        serde_yaml::from_str(yaml_content)?
    };

    Ok((config, template.to_string()))
}

/// Hints shown next to a command in listings.
pub fn hints(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    if template.contains(ARGS_PLACEHOLDER) {
        found.push(ARGS_PLACEHOLDER.to_string());
    }
    if template.contains(SHELL_INJECTION_TRIGGER) {
        found.push(format!("{SHELL_INJECTION_TRIGGER}...}}"));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontmatter_with_yaml() {
        let content = r#"---
description: "Review changes"
aliases: [rv]
---

Review: !{git diff {{args}}}"#;

        let (config, template) = parse_frontmatter(content).unwrap();

        assert_eq!(config.description, Some("Review changes".to_string()));
        assert_eq!(config.aliases, vec!["rv"]);
        assert_eq!(template, "Review: !{git diff {{args}}}");
    }

    #[test]
    fn test_parse_frontmatter_empty() {
        let content = "---\n---\n\nTemplate only.";

        let (config, template) = parse_frontmatter(content).unwrap();

        assert_eq!(config, CommandConfig::default());
        assert_eq!(template, "Template only.");
    }

    #[test]
    fn test_parse_frontmatter_no_yaml() {
        let (config, template) = parse_frontmatter("Just a template.").unwrap();

        assert!(config.description.is_none());
        assert_eq!(template, "Just a template.");
    }

    #[test]
    fn test_parse_frontmatter_missing_closing() {
        let content = "---\ndescription: \"Test\"\n\nNo closing delimiter";
        assert!(matches!(
            parse_frontmatter(content),
            Err(CommandError::InvalidFrontmatter(_))
        ));
    }

    #[test]
    fn test_parse_frontmatter_bad_yaml() {
        let content = "---\naliases: {\n---\nbody";
        assert!(matches!(
            parse_frontmatter(content),
            Err(CommandError::YamlError(_))
        ));
    }

    #[test]
    fn test_hints() {
        assert!(hints("Static template").is_empty());
        assert_eq!(hints("Explain {{args}}"), vec!["{{args}}"]);
        assert_eq!(hints("!{git log} {{args}}"), vec!["{{args}}", "!{...}"]);
    }

    #[test]
    fn test_command_parse() {
        let content = "---\ndescription: \"Build command\"\n---\n\nBuild the project with {{args}}";

        let cmd = Command::parse("build", content, PathBuf::from("/test/build.md")).unwrap();

        assert_eq!(cmd.name, "build");
        assert_eq!(cmd.description(), "Build command");
        assert!(cmd.expects_arguments());
        assert!(!cmd.has_shell_injections());
    }
}
