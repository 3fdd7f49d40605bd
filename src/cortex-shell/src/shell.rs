//! Shell invocation and argument escaping.
//!
//! Every command string is handed to a host shell rather than being split
//! into an argv: `bash -c <command>` on POSIX-like platforms and
//! `<ComSpec> /d /s /c <command>` on Windows.

use std::env;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Environment variable naming the Windows command interpreter.
pub const WINDOWS_SHELL_ENV: &str = "ComSpec";

/// Interpreter used on Windows when `ComSpec` is unset or empty.
pub const DEFAULT_WINDOWS_SHELL: &str = "cmd.exe";

/// Interpreter used on every POSIX-like platform.
pub const POSIX_SHELL: &str = "bash";

static DETECTED: Lazy<ShellInvocationConfig> = Lazy::new(ShellInvocationConfig::detect);

/// Host platform family, as far as shell semantics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellPlatform {
    /// bash and friends.
    Posix,
    /// cmd.exe semantics.
    Windows,
}

impl ShellPlatform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Posix => "posix",
            Self::Windows => "windows",
        }
    }
}

impl std::fmt::Display for ShellPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Executable plus the arguments that precede the command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellInvocationConfig {
    /// Platform whose quoting rules apply.
    pub platform: ShellPlatform,
    /// Program to spawn.
    pub executable: String,
    /// Arguments placed before the command string.
    pub argument_prefix: Vec<String>,
}

impl ShellInvocationConfig {
    /// Resolve the invocation for `platform`.
    ///
    /// `shell_override` only matters on Windows, where it replaces the
    /// interpreter; the `/d /s /c` prefix stays the same either way.
    pub fn resolve(platform: ShellPlatform, shell_override: Option<&str>) -> Self {
        match platform {
            ShellPlatform::Posix => Self {
                platform,
                executable: POSIX_SHELL.to_string(),
                argument_prefix: vec!["-c".to_string()],
            },
            ShellPlatform::Windows => {
                let executable = shell_override
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DEFAULT_WINDOWS_SHELL)
                    .to_string();
                Self {
                    platform,
                    executable,
                    argument_prefix: vec!["/d".to_string(), "/s".to_string(), "/c".to_string()],
                }
            }
        }
    }

    /// Resolve from the running platform and its environment.
    pub fn detect() -> Self {
        let platform = ShellPlatform::current();
        let shell_override = match platform {
            ShellPlatform::Windows => env::var(WINDOWS_SHELL_ENV).ok(),
            ShellPlatform::Posix => None,
        };
        Self::resolve(platform, shell_override.as_deref())
    }

    /// Full argument list for running `command`.
    pub fn args_for(&self, command: &str) -> Vec<String> {
        let mut args = self.argument_prefix.clone();
        args.push(command.to_string());
        args
    }

    /// Escape `raw` for splicing into a command line run by this shell.
    pub fn escape(&self, raw: &str) -> String {
        escape(raw, self)
    }
}

impl Default for ShellInvocationConfig {
    fn default() -> Self {
        shell_config().clone()
    }
}

/// The invocation for this process, resolved on first use.
pub fn shell_config() -> &'static ShellInvocationConfig {
    &DETECTED
}

/// Something that turns a raw string into a command-line-safe one.
pub trait ArgumentEscaper: Send + Sync {
    fn escape(&self, raw: &str) -> String;
}

impl ArgumentEscaper for ShellInvocationConfig {
    fn escape(&self, raw: &str) -> String {
        escape(raw, self)
    }
}

/// Escape `raw` according to the quoting discipline of `config`.
pub fn escape(raw: &str, config: &ShellInvocationConfig) -> String {
    escape_with(raw, config.platform, quote_posix)
}

/// Like [`escape`], with the POSIX quoting routine supplied by the caller.
///
/// Empty input short-circuits to an empty string and never reaches `quote`.
pub fn escape_with<F>(raw: &str, platform: ShellPlatform, quote: F) -> String
where
    F: FnOnce(&str) -> String,
{
    if raw.is_empty() {
        return String::new();
    }
    match platform {
        ShellPlatform::Posix => quote(raw),
        ShellPlatform::Windows => quote_windows(raw),
    }
}

/// Quote for bash. Re-parsing the result yields exactly `raw`.
pub fn quote_posix(raw: &str) -> String {
    shlex::try_quote(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| format!("'{}'", raw.replace('\'', "'\\''")))
}

/// Quote for cmd.exe: wrap in double quotes, doubling embedded ones.
///
/// This does not neutralise `%`, `^` or `!` expansion.
pub fn quote_windows(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_resolve_posix() {
        let config = ShellInvocationConfig::resolve(ShellPlatform::Posix, Some("zsh"));
        assert_eq!(config.executable, "bash");
        assert_eq!(config.argument_prefix, vec!["-c"]);
        assert_eq!(config.args_for("ls -l"), vec!["-c", "ls -l"]);
    }

    #[test]
    fn test_resolve_windows_default() {
        let config = ShellInvocationConfig::resolve(ShellPlatform::Windows, None);
        assert_eq!(config.executable, "cmd.exe");
        assert_eq!(config.argument_prefix, vec!["/d", "/s", "/c"]);

        let blank = ShellInvocationConfig::resolve(ShellPlatform::Windows, Some("  "));
        assert_eq!(blank.executable, "cmd.exe");
    }

    #[test]
    fn test_resolve_windows_override_keeps_prefix() {
        let config = ShellInvocationConfig::resolve(
            ShellPlatform::Windows,
            Some("C:\\Windows\\System32\\cmd.exe"),
        );
        assert_eq!(config.executable, "C:\\Windows\\System32\\cmd.exe");
        assert_eq!(config.argument_prefix, vec!["/d", "/s", "/c"]);
    }

    #[test]
    fn test_detect_matches_platform() {
        let config = shell_config();
        assert_eq!(config.platform, ShellPlatform::current());
        assert!(!config.executable.is_empty());
    }

    #[test]
    fn test_escape_empty_skips_quoting() {
        let calls = Cell::new(0);
        let quote = |s: &str| {
            calls.set(calls.get() + 1);
            quote_posix(s)
        };

        assert_eq!(escape_with("", ShellPlatform::Posix, quote), "");
        assert_eq!(calls.get(), 0);

        let escaped = escape_with("a b", ShellPlatform::Posix, |s: &str| {
            calls.set(calls.get() + 1);
            quote_posix(s)
        });
        assert_eq!(escaped, "'a b'");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_escape_windows() {
        let config = ShellInvocationConfig::resolve(ShellPlatform::Windows, None);
        assert_eq!(
            config.escape("He said \"Hello\""),
            "\"He said \"\"Hello\"\"\""
        );
        assert_eq!(config.escape(""), "");
    }

    #[test]
    fn test_posix_quote_survives_reparse() {
        let config = ShellInvocationConfig::resolve(ShellPlatform::Posix, None);
        for raw in ["plain", "a b", "it's", "$(rm -rf /)", "`id`", "x; y && z", "\"q\""] {
            let escaped = config.escape(raw);
            assert_eq!(
                shlex::split(&escaped),
                Some(vec![raw.to_string()]),
                "escaping {raw:?} produced {escaped:?}"
            );
        }
    }
}
