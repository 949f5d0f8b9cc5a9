//! Termination Engine - Dừng một process cùng toàn bộ descendants
//!
//! Protocol:
//! 1. Enumerate live processes, build the descendant set breadth-first.
//! 2. Snapshot the PID list BEFORE the first kill. Never re-enumerate
//!    mid-operation: a freed PID can be reused by an unrelated process.
//! 3. Gate on the target's tier before touching anything (Blocked for all).
//! 4. Kill per PID, recording an outcome for every PID in the snapshot.
//!    A process that exited on its own between snapshot and kill is
//!    AlreadyExited, an expected race, not an error.
//! 5. AccessDenied on one PID never aborts the rest. No automatic retries.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::OS_COMMAND_TIMEOUT_SECS;
use crate::logic::collector;
use crate::logic::oscmd::{run_with_timeout, CommandError};
use crate::logic::process_intel::snapshot::ProcessSnapshot;
use crate::logic::process_intel::types::ProcessRecord;
use crate::logic::safety::{classify_snapshot, SafetyTier};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Kết quả cho một PID trong termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationResult {
    Terminated,
    /// Exited on its own between snapshot and kill (expected race)
    AlreadyExited,
    AccessDenied,
    /// Tier gate refused the operation before any kill was issued
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidOutcome {
    pub pid: u32,
    pub name: String,
    pub result: TerminationResult,
    /// OS-level detail for failures, empty otherwise
    pub detail: String,
}

/// Per-request report: one outcome per PID in the pre-kill snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationReport {
    pub target: u32,
    pub target_tier: Option<SafetyTier>,
    pub outcomes: Vec<PidOutcome>,
}

impl TerminationReport {
    pub fn all_blocked(&self) -> bool {
        !self.outcomes.is_empty()
            && self.outcomes.iter().all(|o| o.result == TerminationResult::Blocked)
    }

    pub fn terminated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result == TerminationResult::Terminated).count()
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Dừng process `target` và toàn bộ descendants của nó.
///
/// The caller has already collected user confirmation; this engine trusts the
/// `confirmed` flag plus, for Critical targets, the explicit `override_critical`.
pub fn terminate_tree(target: u32, confirmed: bool, override_critical: bool) -> TerminationReport {
    // Live enumeration, not the cached scan snapshot: PIDs must be
    // re-validated at execution time.
    let snapshot = ProcessSnapshot::from_records(collector::live_records());
    run_termination(&snapshot, target, confirmed, override_critical, kill_pid)
}

/// Core protocol, với kill primitive inject được cho tests.
pub fn run_termination(
    snapshot: &ProcessSnapshot,
    target: u32,
    confirmed: bool,
    override_critical: bool,
    mut kill: impl FnMut(&ProcessRecord) -> (TerminationResult, String),
) -> TerminationReport {
    let Some(target_record) = snapshot.get(target) else {
        // Target gone before we started; nothing else to walk.
        return TerminationReport {
            target,
            target_tier: None,
            outcomes: vec![PidOutcome {
                pid: target,
                name: String::new(),
                result: TerminationResult::AlreadyExited,
                detail: String::new(),
            }],
        };
    };

    // Fixed pre-kill snapshot of the tree: descendants first, target last
    let mut plan: Vec<u32> = snapshot.descendants(target);
    plan.push(target);

    let verdicts = classify_snapshot(snapshot, &HashMap::new());
    let target_tier = verdicts.get(&target).map(|v| v.tier);

    // Tier gate, evaluated before the first kill
    let blocked_reason = if !confirmed {
        Some("termination not confirmed by caller".to_string())
    } else if target_tier == Some(SafetyTier::Critical) && !override_critical {
        Some(format!(
            "{} is a critical system process; override required",
            target_record.name
        ))
    } else {
        None
    };

    if let Some(reason) = blocked_reason {
        log::warn!("Termination of PID {} refused: {}", target, reason);
        let outcomes = plan
            .into_iter()
            .map(|pid| PidOutcome {
                pid,
                name: snapshot.get(pid).map(|r| r.name.clone()).unwrap_or_default(),
                result: TerminationResult::Blocked,
                detail: reason.clone(),
            })
            .collect();
        return TerminationReport { target, target_tier, outcomes };
    }

    log::warn!(
        "Terminating PID {} ({}) and {} descendants",
        target,
        target_record.name,
        plan.len() - 1
    );

    let outcomes = plan
        .into_iter()
        .map(|pid| {
            let record = snapshot.get(pid).expect("plan PIDs come from the snapshot");
            let (result, detail) = kill(record);
            PidOutcome { pid, name: record.name.clone(), result, detail }
        })
        .collect();

    TerminationReport { target, target_tier, outcomes }
}

// ============================================================================
// KILL PRIMITIVE
// ============================================================================

/// Kill một PID, phân loại kết quả theo taxonomy của engine.
fn kill_pid(record: &ProcessRecord) -> (TerminationResult, String) {
    // Re-validate liveness right before the kill; the snapshot may be stale
    // by the time we get here.
    if !collector::pid_alive(record.pid) {
        return (TerminationResult::AlreadyExited, String::new());
    }

    match issue_kill(record.pid) {
        Ok(output) if output.success => (TerminationResult::Terminated, String::new()),
        Ok(output) => {
            let stderr = output.stderr.trim().to_string();
            (classify_kill_failure(&stderr), stderr)
        }
        Err(CommandError::TimedOut { .. }) => {
            (TerminationResult::AccessDenied, "kill command timed out".to_string())
        }
        Err(e) => (TerminationResult::AccessDenied, e.to_string()),
    }
}

#[cfg(windows)]
fn issue_kill(pid: u32) -> Result<crate::logic::oscmd::CommandOutput, CommandError> {
    run_with_timeout(
        "taskkill",
        &["/PID", &pid.to_string(), "/F"],
        Duration::from_secs(OS_COMMAND_TIMEOUT_SECS),
    )
}

#[cfg(not(windows))]
fn issue_kill(pid: u32) -> Result<crate::logic::oscmd::CommandOutput, CommandError> {
    run_with_timeout(
        "kill",
        &["-9", &pid.to_string()],
        Duration::from_secs(OS_COMMAND_TIMEOUT_SECS),
    )
}

/// Map kill stderr vào taxonomy {AlreadyExited, AccessDenied}
fn classify_kill_failure(stderr: &str) -> TerminationResult {
    let lower = stderr.to_lowercase();
    if lower.contains("not found") || lower.contains("no such process") {
        TerminationResult::AlreadyExited
    } else {
        TerminationResult::AccessDenied
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rec(pid: u32, ppid: Option<u32>, name: &str) -> ProcessRecord {
        let mut r = ProcessRecord::new(pid, name);
        r.parent_pid = ppid;
        r.user = Some("DESKTOP\\alice".to_string());
        r
    }

    fn renderer_tree() -> ProcessSnapshot {
        // A Safe browser with spawned renderer children
        ProcessSnapshot::from_records(vec![
            rec(100, None, "firefox.exe"),
            rec(110, Some(100), "firefox.exe"),
            rec(111, Some(100), "firefox.exe"),
            rec(999, None, "notepad.exe"),
        ])
    }

    #[test]
    fn test_safe_tree_terminates_target_and_children() {
        let snapshot = renderer_tree();
        let report = run_termination(&snapshot, 100, true, false, |_| {
            (TerminationResult::Terminated, String::new())
        });

        let pids: HashSet<u32> = report.outcomes.iter().map(|o| o.pid).collect();
        assert_eq!(pids, HashSet::from([100, 110, 111]));
        assert_eq!(report.terminated_count(), 3);
        assert_eq!(report.target_tier, Some(SafetyTier::Safe));
        // Target is killed last
        assert_eq!(report.outcomes.last().unwrap().pid, 100);
    }

    #[test]
    fn test_critical_without_override_blocks_everything() {
        // Critical target, override=false -> Blocked for every
        // PID in the tree, nothing killed
        let snapshot = ProcessSnapshot::from_records(vec![
            rec(500, None, "lsass.exe"),
            rec(510, Some(500), "child.exe"),
        ]);

        let mut kills = 0;
        let report = run_termination(&snapshot, 500, true, false, |_| {
            kills += 1;
            (TerminationResult::Terminated, String::new())
        });

        assert_eq!(kills, 0, "gate must refuse before the first kill");
        assert!(report.all_blocked());
        assert_eq!(report.outcomes.len(), 2);
    }

    #[test]
    fn test_critical_with_override_proceeds() {
        let snapshot = ProcessSnapshot::from_records(vec![rec(500, None, "lsass.exe")]);
        let report = run_termination(&snapshot, 500, true, true, |_| {
            (TerminationResult::Terminated, String::new())
        });
        assert_eq!(report.terminated_count(), 1);
    }

    #[test]
    fn test_unconfirmed_request_blocks() {
        let snapshot = renderer_tree();
        let report = run_termination(&snapshot, 100, false, false, |_| {
            panic!("kill must not run without confirmation")
        });
        assert!(report.all_blocked());
    }

    #[test]
    fn test_race_reports_already_exited() {
        // Scenario: child 110 exits between snapshot and kill
        let snapshot = renderer_tree();
        let report = run_termination(&snapshot, 100, true, false, |record| {
            if record.pid == 110 {
                (TerminationResult::AlreadyExited, String::new())
            } else {
                (TerminationResult::Terminated, String::new())
            }
        });

        let by_pid: std::collections::HashMap<u32, TerminationResult> =
            report.outcomes.iter().map(|o| (o.pid, o.result)).collect();
        assert_eq!(by_pid[&110], TerminationResult::AlreadyExited);
        assert_eq!(by_pid[&100], TerminationResult::Terminated);
    }

    #[test]
    fn test_access_denied_does_not_abort_rest() {
        let snapshot = renderer_tree();
        let report = run_termination(&snapshot, 100, true, false, |record| {
            if record.pid == 110 {
                (TerminationResult::AccessDenied, "Access is denied.".to_string())
            } else {
                (TerminationResult::Terminated, String::new())
            }
        });

        assert_eq!(report.terminated_count(), 2);
        assert_eq!(report.outcomes.len(), 3);
    }

    #[test]
    fn test_missing_target_is_already_exited() {
        let snapshot = ProcessSnapshot::from_records(vec![]);
        let report = run_termination(&snapshot, 4242, true, false, |_| {
            panic!("nothing to kill")
        });
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].result, TerminationResult::AlreadyExited);
    }

    #[test]
    fn test_classify_kill_failure() {
        assert_eq!(
            classify_kill_failure("ERROR: The process \"1234\" not found."),
            TerminationResult::AlreadyExited
        );
        assert_eq!(
            classify_kill_failure("kill: (1234): No such process"),
            TerminationResult::AlreadyExited
        );
        assert_eq!(
            classify_kill_failure("ERROR: Access is denied."),
            TerminationResult::AccessDenied
        );
    }
}
