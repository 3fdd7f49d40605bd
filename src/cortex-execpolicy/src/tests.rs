//! Tests for Cortex ExecPolicy module.
//!
//! Coverage for:
//! 1. Default-allow evaluation (no session allowlist)
//! 2. Default-deny evaluation (session allowlist present)
//! 3. Block list precedence
//! 4. Substitution rejection
//! 5. Aggregation across chain segments

use super::*;

fn policy(allowed: &[&str], blocked: &[&str]) -> CommandPolicy {
    CommandPolicy::from_entries(SHELL_TOOL_NAME, allowed.iter(), blocked.iter()).unwrap()
}

// ============================================================================
// Default-allow mode
// ============================================================================

mod default_allow_tests {
    use super::*;

    #[test]
    fn test_empty_policy_allows_everything() {
        let verdict = check_command_permissions("rm -rf build && make", &policy(&[], &[]), None);
        assert!(verdict.all_allowed);
        assert!(verdict.disallowed_commands.is_empty());
        assert_eq!(verdict.block_reason, None);
        assert!(!verdict.is_hard_denial);
    }

    #[test]
    fn test_wildcard_allow_allows_everything() {
        let verdict = check_command_permissions("curl example.com", &policy(&["Execute"], &[]), None);
        assert!(verdict.all_allowed);
    }

    #[test]
    fn test_specific_allowlist_restricts() {
        let p = policy(&["Execute(git)", "Execute(ls -la)"], &[]);

        assert!(check_command_permissions("git status", &p, None).all_allowed);
        assert!(check_command_permissions("ls -la", &p, None).all_allowed);

        let verdict = check_command_permissions("ls -la /etc", &p, None);
        assert!(!verdict.all_allowed);
        assert!(!verdict.is_hard_denial);
        assert_eq!(verdict.disallowed_commands, vec!["ls -la /etc"]);
        assert_eq!(verdict.decision(), Decision::Ask);
    }

    #[test]
    fn test_allow_entries_for_other_tools_do_not_restrict() {
        let p = policy(&["Read", "Edit"], &[]);
        assert!(check_command_permissions("npm test", &p, None).all_allowed);
    }

    #[test]
    fn test_blocked_root() {
        let verdict = check_command_permissions("rm -rf /tmp/x", &policy(&[], &["Execute(rm)"]), None);
        assert!(!verdict.all_allowed);
        assert!(verdict.is_hard_denial);
        assert_eq!(verdict.disallowed_commands, vec!["rm -rf /tmp/x"]);
        assert!(
            verdict
                .block_reason
                .as_deref()
                .is_some_and(|r| r.contains("blocked by configuration"))
        );
    }
}

// ============================================================================
// Default-deny mode
// ============================================================================

mod session_tests {
    use super::*;

    #[test]
    fn test_empty_session_denies_unknown() {
        let session = SessionAllowlist::new();
        let verdict = check_command_permissions("make build", &policy(&[], &[]), Some(&session));

        assert!(!verdict.all_allowed);
        assert!(!verdict.is_hard_denial);
        assert_eq!(verdict.disallowed_commands, vec!["make build"]);
    }

    #[test]
    fn test_global_allowlist_passes() {
        let session = SessionAllowlist::new();
        let verdict = check_command_permissions(
            "ls 'a b' -l",
            &policy(&["Execute(ls)"], &[]),
            Some(&session),
        );
        assert!(verdict.all_allowed);
    }

    #[test]
    fn test_session_exact_match_passes() {
        let session = SessionAllowlist::new();
        session.allow("make build");

        let p = policy(&[], &[]);
        assert!(check_command_permissions("make build", &p, Some(&session)).all_allowed);
        assert!(!check_command_permissions("make build-all", &p, Some(&session)).all_allowed);
        assert!(!check_command_permissions("make", &p, Some(&session)).all_allowed);
    }

    #[test]
    fn test_session_approval_does_not_override_block() {
        let session = SessionAllowlist::new();
        session.allow("sudo reboot");

        let verdict = check_command_permissions(
            "sudo reboot",
            &policy(&[], &["Execute(sudo)"]),
            Some(&session),
        );
        assert!(!verdict.all_allowed);
        assert!(verdict.is_hard_denial);
    }

    #[test]
    fn test_session_segments_checked_individually() {
        let session = SessionAllowlist::new();
        session.allow("npm ci");

        let verdict = check_command_permissions(
            "npm ci && npm run deploy",
            &policy(&[], &[]),
            Some(&session),
        );
        assert_eq!(verdict.disallowed_commands, vec!["npm run deploy"]);
    }
}

// ============================================================================
// Block list precedence
// ============================================================================

mod precedence_tests {
    use super::*;

    #[test]
    fn test_wildcard_allow_and_specific_block() {
        let p = policy(&["Execute"], &["Execute(rm)"]);

        let verdict = check_command_permissions("rm -rf /", &p, None);
        assert!(!verdict.all_allowed);
        assert!(verdict.is_hard_denial);

        let session = SessionAllowlist::new();
        let verdict = check_command_permissions("rm -rf /", &p, Some(&session));
        assert!(verdict.is_hard_denial);
    }

    #[test]
    fn test_same_entry_in_both_lists() {
        let p = policy(&["Execute(git push)"], &["Execute(git push)"]);
        let verdict = check_command_permissions("git push", &p, None);
        assert!(verdict.is_hard_denial);
    }

    #[test]
    fn test_tool_disabled_blocks_everything() {
        let p = policy(&["Execute(ls)"], &["Execute"]);
        let verdict = check_command_permissions("ls", &p, None);
        assert!(verdict.is_hard_denial);
        assert_eq!(
            verdict.block_reason.as_deref(),
            Some("Shell tool is globally disabled in configuration")
        );
    }
}

// ============================================================================
// Substitution rejection
// ============================================================================

mod substitution_tests {
    use super::*;

    #[test]
    fn test_substitution_is_hard_even_when_allowed() {
        let p = policy(&["Execute"], &[]);
        for cmd in ["echo $(cat /etc/passwd)", "echo `id`", "diff <(ls) <(ls -a)"] {
            let verdict = check_command_permissions(cmd, &p, None);
            assert!(verdict.is_hard_denial, "{cmd} should be a hard denial");
            assert_eq!(verdict.disallowed_commands, vec![cmd]);
        }
    }

    #[test]
    fn test_single_quoted_substitution_is_text() {
        let p = policy(&["Execute(echo)"], &[]);
        assert!(check_command_permissions("echo '$(id)'", &p, None).all_allowed);
    }

    #[test]
    fn test_substitution_in_later_segment() {
        let session = SessionAllowlist::new();
        session.allow("ls");
        let verdict = check_command_permissions("ls; echo $(id)", &policy(&[], &[]), Some(&session));
        assert!(verdict.is_hard_denial);
        assert_eq!(verdict.disallowed_commands, vec!["ls; echo $(id)"]);
    }
}

// ============================================================================
// Aggregation
// ============================================================================

mod aggregation_tests {
    use super::*;

    #[test]
    fn test_every_failing_segment_is_listed_in_order() {
        let session = SessionAllowlist::new();
        let verdict = check_command_permissions("cmd1 && cmd2", &policy(&[], &[]), Some(&session));

        assert!(!verdict.all_allowed);
        assert_eq!(verdict.disallowed_commands, vec!["cmd1", "cmd2"]);
        assert!(!verdict.is_hard_denial);
        assert!(
            verdict
                .block_reason
                .as_deref()
                .is_some_and(|r| r.contains("cmd1"))
        );
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let session = SessionAllowlist::new();
        let verdict =
            check_command_permissions("make; make; make test", &policy(&[], &[]), Some(&session));
        assert_eq!(verdict.disallowed_commands, vec!["make", "make test"]);
    }

    #[test]
    fn test_mixed_soft_and_hard() {
        let session = SessionAllowlist::new();
        let verdict = check_command_permissions(
            "make && rm -rf /",
            &policy(&[], &["Execute(rm)"]),
            Some(&session),
        );

        assert!(verdict.is_hard_denial);
        assert_eq!(verdict.disallowed_commands, vec!["make", "rm -rf /"]);
        assert!(
            verdict
                .block_reason
                .as_deref()
                .is_some_and(|r| r.contains("'make'"))
        );
        let hard = verdict.hard_denial.as_ref().unwrap();
        assert_eq!(hard.command, "rm -rf /");
        assert!(hard.reason.contains("blocked by configuration"));
    }

    #[test]
    fn test_exec_policy_wrapper() {
        let exec = ExecPolicy::new(policy(&["Execute(git)"], &[]));
        assert_eq!(exec.check("git log", None).decision(), Decision::Allow);
        assert_eq!(exec.check("cargo build", None).decision(), Decision::Ask);
        assert_eq!(exec.check("git log `id`", None).decision(), Decision::Deny);
    }

    #[test]
    fn test_empty_command_is_allowed() {
        let session = SessionAllowlist::new();
        assert!(check_command_permissions("   ", &policy(&[], &[]), Some(&session)).all_allowed);
    }
}
