//! Permission decision types.

use serde::{Deserialize, Serialize};

/// Outcome for a single chain segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Decision {
    /// Execution authorized automatically.
    Allow,
    /// Not allow-listed; the user may approve it.
    Ask,
    /// Blocked by configuration or an unsafe construct; never approvable.
    Deny,
}

impl Decision {
    /// Returns true if the decision requires user interaction.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Decision::Ask)
    }

    /// Returns true if the decision blocks execution.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Decision::Deny)
    }

    /// Combine two decisions, taking the most restrictive.
    pub fn combine(self, other: Decision) -> Decision {
        self.max(other)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => write!(f, "ALLOW"),
            Decision::Ask => write!(f, "ASK"),
            Decision::Deny => write!(f, "DENY"),
        }
    }
}

/// Aggregate verdict for a whole command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionVerdict {
    /// Every segment passed.
    pub all_allowed: bool,
    /// Failing segments in original order, without duplicates.
    pub disallowed_commands: Vec<String>,
    /// Cause of the first failure.
    pub block_reason: Option<String>,
    /// At least one failure came from the block list or an unsafe construct.
    pub is_hard_denial: bool,
    /// First segment that failed hard, with its reason.
    pub hard_denial: Option<HardDenial>,
}

/// The segment behind a hard denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardDenial {
    pub command: String,
    pub reason: String,
}

impl PermissionVerdict {
    pub fn allowed() -> Self {
        Self {
            all_allowed: true,
            ..Default::default()
        }
    }

    /// Collapse the verdict into a single [`Decision`].
    pub fn decision(&self) -> Decision {
        if self.all_allowed {
            Decision::Allow
        } else if self.is_hard_denial {
            Decision::Deny
        } else {
            Decision::Ask
        }
    }

    /// Record one failing segment.
    pub(crate) fn deny(&mut self, command: &str, reason: String, hard: bool) {
        self.all_allowed = false;
        self.is_hard_denial |= hard;
        if hard && self.hard_denial.is_none() {
            self.hard_denial = Some(HardDenial {
                command: command.to_string(),
                reason: reason.clone(),
            });
        }
        if self.block_reason.is_none() {
            self.block_reason = Some(reason);
        }
        if !self.disallowed_commands.iter().any(|c| c == command) {
            self.disallowed_commands.push(command.to_string());
        }
    }
}
