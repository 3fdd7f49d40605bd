#![allow(clippy::missing_errors_doc, clippy::doc_markdown)]
//! Cortex Execpolicy - permission checks for shell commands.
//!
//! This module determines if a command line may run:
//! - `Allow` - every chain segment is permitted
//! - `Ask` - some segment is merely not allow-listed; the user may approve it
//! - `Deny` - some segment is blocked, or the line contains an unsafe construct
//!
//! # Evaluation
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Command line                   │
//! └────────────────────┬───────────────────────┘
//!                      │
//!                      ▼
//! ┌────────────────────────────────────────────┐
//! │  $(...), `...`, <(...) or >(...) present?  │
//! └────────────────────┬───────────────────────┘
//!        ┌─────────────┴─────────────┐
//!      [Yes]                        [No]
//!        │                           │
//!        ▼                           ▼
//!   ┌─────────┐         split at ; | & && || and check
//!   │  DENY   │         each segment:
//!   └─────────┘           blocked?            → DENY
//!                         session mode:
//!                           allowed or approved? → ALLOW, else ASK
//!                         default mode:
//!                           no allow list or on it → ALLOW, else ASK
//! ```
//!
//! Policy entries name a tool (`Execute`), optionally qualified by a root
//! program (`Execute(git)`) or an exact command (`Execute(git push)`).

#[cfg(test)]
mod tests;

mod command;
mod config;
mod decision;
mod detection;
mod entry;
mod error;
mod policy;
mod session;

pub use command::{ChainSegment, command_root, get_command_roots, parse_segments, split_commands};
pub use config::{PolicyConfig, PolicySource};
pub use decision::{Decision, HardDenial, PermissionVerdict};
pub use detection::{SubstitutionKind, detect_command_substitution, find_command_substitution};
pub use entry::{CommandPolicy, PolicyEntry, SHELL_TOOL_NAME};
pub use error::PolicyError;
pub use policy::{ExecPolicy, check_command_permissions};
pub use session::SessionAllowlist;
