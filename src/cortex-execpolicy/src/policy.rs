//! Permission evaluation for shell command lines.

use tracing::{debug, warn};

use crate::command::{ChainSegment, parse_segments};
use crate::decision::{Decision, PermissionVerdict};
use crate::detection::find_command_substitution;
use crate::entry::CommandPolicy;
use crate::session::SessionAllowlist;

/// Evaluates command lines against a policy snapshot.
///
/// Two modes exist and they are not interchangeable:
/// - without a session allowlist, commands are allowed unless blocked, or
///   unless an allow list exists and the command is not on it;
/// - with a session allowlist, commands are denied unless they match the
///   allow list or were approved earlier in the session.
#[derive(Debug, Clone, Default)]
pub struct ExecPolicy {
    policy: CommandPolicy,
}

impl ExecPolicy {
    pub fn new(policy: CommandPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CommandPolicy {
        &self.policy
    }

    /// Check every segment of `command` and aggregate the failures.
    pub fn check(&self, command: &str, session: Option<&SessionAllowlist>) -> PermissionVerdict {
        check_command_permissions(command, &self.policy, session)
    }
}

/// Check `command` against `policy`, optionally in session (default-deny) mode.
pub fn check_command_permissions(
    command: &str,
    policy: &CommandPolicy,
    session: Option<&SessionAllowlist>,
) -> PermissionVerdict {
    let command = command.trim();
    let mut verdict = PermissionVerdict::allowed();

    if let Some(kind) = find_command_substitution(command) {
        warn!(command, construct = %kind, "Rejected command substitution");
        verdict.deny(
            command,
            format!("Command substitution using {kind} is not allowed for security reasons"),
            true,
        );
        return verdict;
    }

    for segment in parse_segments(command) {
        let (decision, reason) = check_segment(policy, &segment, session);
        debug!(segment = %segment.text, %decision, "Evaluated command segment");
        if let Some(reason) = reason {
            if decision.is_blocked() {
                warn!(segment = %segment.text, reason = %reason, "Command blocked");
            }
            verdict.deny(&segment.text, reason, decision.is_blocked());
        }
    }

    verdict
}

fn check_segment(
    policy: &CommandPolicy,
    segment: &ChainSegment,
    session: Option<&SessionAllowlist>,
) -> (Decision, Option<String>) {
    if policy.is_tool_disabled() {
        return (
            Decision::Deny,
            Some("Shell tool is globally disabled in configuration".to_string()),
        );
    }

    // Block entries win even when the same command is also allowed.
    if let Some(entry) = policy.blocked_by(segment) {
        return (
            Decision::Deny,
            Some(format!(
                "Command '{}' is blocked by configuration ({entry})",
                segment.text
            )),
        );
    }

    match session {
        Some(session) => {
            if policy.allowed_by(segment).is_some() || session.contains(&segment.text) {
                (Decision::Allow, None)
            } else {
                (
                    Decision::Ask,
                    Some(format!(
                        "Command '{}' is not on the global or session allowlist",
                        segment.text
                    )),
                )
            }
        }
        None => {
            if policy.has_allowlist() && policy.allowed_by(segment).is_none() {
                (
                    Decision::Ask,
                    Some(format!(
                        "Command '{}' is not in the allowed commands list",
                        segment.text
                    )),
                )
            } else {
                (Decision::Allow, None)
            }
        }
    }
}
