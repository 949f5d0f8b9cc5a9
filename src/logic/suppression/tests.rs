//! Scenario tests for the suppression manager, run against an in-memory
//! fake of the four OS mechanisms. The engine itself never touches the OS
//! here; the backend seam is the whole point.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::logic::safety::SafetyTier;

use super::audit::AuditLog;
use super::backend::MechanismBackend;
use super::manager::SuppressionManager;
use super::store::SuppressionStore;
use super::types::{
    CapturedState, RegistryHive, ServiceStartMode, SuppressTarget, SuppressionError,
    SuppressionStatus,
};

// ============================================================================
// FAKE OS
// ============================================================================

#[derive(Default)]
struct FakeOs {
    services: HashMap<String, ServiceStartMode>,
    run_values: HashMap<String, String>,
    disabled_run: HashMap<String, String>,
    tasks: HashMap<String, bool>,
    ifeo: HashMap<String, String>,
    disable_calls: u32,
    restore_calls: u32,
}

const FAKE_BLOCKER: &str = r"C:\Windows\System32\systray.exe";

fn run_slot(hive: RegistryHive, value_name: &str) -> String {
    format!("{}:{}", hive.prefix(), value_name.to_lowercase())
}

struct FakeBackend(Arc<Mutex<FakeOs>>);

impl MechanismBackend for FakeBackend {
    fn capture(&self, target: &SuppressTarget) -> Result<CapturedState, SuppressionError> {
        let os = self.0.lock();
        match target {
            SuppressTarget::Service { name } => {
                let mode = os
                    .services
                    .get(&name.to_lowercase())
                    .copied()
                    .ok_or_else(|| SuppressionError::NotFound(format!("service '{}'", name)))?;
                Ok(CapturedState::ServiceStartMode { mode })
            }
            SuppressTarget::RunKey { hive, value_name } => Ok(CapturedState::RunKeyValue {
                prior: os.run_values.get(&run_slot(*hive, value_name)).cloned(),
            }),
            SuppressTarget::ScheduledTask { path } => {
                let enabled = os
                    .tasks
                    .get(&path.to_lowercase())
                    .copied()
                    .ok_or_else(|| SuppressionError::NotFound(format!("task '{}'", path)))?;
                Ok(CapturedState::TaskEnabled { enabled })
            }
            SuppressTarget::Ifeo { exe_name } => Ok(CapturedState::IfeoDebugger {
                prior: os.ifeo.get(&exe_name.to_lowercase()).cloned(),
            }),
        }
    }

    fn disable(&self, target: &SuppressTarget) -> Result<(), SuppressionError> {
        let mut os = self.0.lock();
        os.disable_calls += 1;
        match target {
            SuppressTarget::Service { name } => {
                let slot = name.to_lowercase();
                if !os.services.contains_key(&slot) {
                    return Err(SuppressionError::NotFound(format!("service '{}'", name)));
                }
                os.services.insert(slot, ServiceStartMode::Disabled);
                Ok(())
            }
            SuppressTarget::RunKey { hive, value_name } => {
                let slot = run_slot(*hive, value_name);
                if let Some(value) = os.run_values.remove(&slot) {
                    os.disabled_run.insert(slot, value);
                }
                Ok(())
            }
            SuppressTarget::ScheduledTask { path } => {
                let slot = path.to_lowercase();
                if !os.tasks.contains_key(&slot) {
                    return Err(SuppressionError::NotFound(format!("task '{}'", path)));
                }
                os.tasks.insert(slot, false);
                Ok(())
            }
            SuppressTarget::Ifeo { exe_name } => {
                os.ifeo.insert(exe_name.to_lowercase(), FAKE_BLOCKER.to_string());
                Ok(())
            }
        }
    }

    fn restore(
        &self,
        target: &SuppressTarget,
        state: &CapturedState,
    ) -> Result<(), SuppressionError> {
        let mut os = self.0.lock();
        os.restore_calls += 1;
        match (target, state) {
            (SuppressTarget::Service { name }, CapturedState::ServiceStartMode { mode }) => {
                let slot = name.to_lowercase();
                if !os.services.contains_key(&slot) {
                    return Err(SuppressionError::NotFound(format!(
                        "service '{}' no longer exists",
                        name
                    )));
                }
                os.services.insert(slot, *mode);
                Ok(())
            }
            (SuppressTarget::RunKey { hive, value_name }, CapturedState::RunKeyValue { prior }) => {
                let slot = run_slot(*hive, value_name);
                match prior {
                    Some(value) => {
                        os.run_values.insert(slot.clone(), value.clone());
                        os.disabled_run.remove(&slot);
                    }
                    None => {
                        os.run_values.remove(&slot);
                    }
                }
                Ok(())
            }
            (SuppressTarget::ScheduledTask { path }, CapturedState::TaskEnabled { enabled }) => {
                let slot = path.to_lowercase();
                if !os.tasks.contains_key(&slot) {
                    return Err(SuppressionError::NotFound(format!(
                        "task '{}' no longer exists",
                        path
                    )));
                }
                os.tasks.insert(slot, *enabled);
                Ok(())
            }
            (SuppressTarget::Ifeo { exe_name }, CapturedState::IfeoDebugger { prior }) => {
                let slot = exe_name.to_lowercase();
                match prior {
                    Some(value) => {
                        os.ifeo.insert(slot, value.clone());
                    }
                    None => {
                        os.ifeo.remove(&slot);
                    }
                }
                Ok(())
            }
            _ => Err(SuppressionError::Backend("state/target mismatch".to_string())),
        }
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

struct Fixture {
    manager: SuppressionManager,
    os: Arc<Mutex<FakeOs>>,
    dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let os = Arc::new(Mutex::new(FakeOs::default()));
    {
        let mut state = os.lock();
        state.services.insert("updatersvc".to_string(), ServiceStartMode::Auto);
        state
            .run_values
            .insert(run_slot(RegistryHive::CurrentUser, "Updater"), r"C:\Tools\updater.exe".to_string());
        state.tasks.insert(r"\vendor\updatetask".to_string(), true);
    }

    let store = SuppressionStore::load(dir.path().join("suppressions.json")).unwrap();
    let audit = AuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    let manager = SuppressionManager::new(store, audit, Box::new(FakeBackend(os.clone())));

    Fixture { manager, os, dir }
}

fn service_target() -> SuppressTarget {
    SuppressTarget::Service { name: "UpdaterSvc".to_string() }
}

fn run_key_target() -> SuppressTarget {
    SuppressTarget::RunKey { hive: RegistryHive::CurrentUser, value_name: "Updater".to_string() }
}

fn task_target() -> SuppressTarget {
    SuppressTarget::ScheduledTask { path: r"\Vendor\UpdateTask".to_string() }
}

fn ifeo_target() -> SuppressTarget {
    SuppressTarget::Ifeo { exe_name: "updater.exe".to_string() }
}

// ============================================================================
// ROUND TRIPS
// ============================================================================

#[test]
fn test_service_suppress_revert_round_trip() {
    let f = fixture();

    let entry = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    assert_eq!(entry.status, SuppressionStatus::Active);
    assert_eq!(f.os.lock().services["updatersvc"], ServiceStartMode::Disabled);
    assert_eq!(entry.captured, CapturedState::ServiceStartMode { mode: ServiceStartMode::Auto });

    let reverted = f.manager.revert(&entry.id).unwrap();
    assert_eq!(reverted.status, SuppressionStatus::Reverted);
    // Exact pre-suppression observable state
    assert_eq!(f.os.lock().services["updatersvc"], ServiceStartMode::Auto);
}

#[test]
fn test_run_key_round_trip_preserves_literal_value() {
    let f = fixture();
    let slot = run_slot(RegistryHive::CurrentUser, "Updater");

    let entry = f.manager.suppress(run_key_target(), "updater.exe", SafetyTier::Safe).unwrap();
    {
        let os = f.os.lock();
        assert!(!os.run_values.contains_key(&slot), "value must be deleted");
        assert_eq!(os.disabled_run[&slot], r"C:\Tools\updater.exe");
    }

    f.manager.revert(&entry.id).unwrap();
    {
        let os = f.os.lock();
        assert_eq!(os.run_values[&slot], r"C:\Tools\updater.exe");
        assert!(!os.disabled_run.contains_key(&slot));
    }
}

#[test]
fn test_run_key_absent_prior_reverts_to_absence() {
    let f = fixture();
    let target = SuppressTarget::RunKey {
        hive: RegistryHive::LocalMachine,
        value_name: "GhostEntry".to_string(),
    };

    let entry = f.manager.suppress(target, "ghost.exe", SafetyTier::Safe).unwrap();
    assert_eq!(entry.captured, CapturedState::RunKeyValue { prior: None });

    let reverted = f.manager.revert(&entry.id).unwrap();
    assert_eq!(reverted.status, SuppressionStatus::Reverted);
    assert!(!f.os.lock().run_values.contains_key(&run_slot(RegistryHive::LocalMachine, "GhostEntry")));

    // Revert-of-revert stays a no-op
    let again = f.manager.revert(&entry.id).unwrap();
    assert_eq!(again.status, SuppressionStatus::Reverted);
}

#[test]
fn test_task_round_trip_restores_enabled_flag() {
    let f = fixture();

    let entry = f.manager.suppress(task_target(), "updater.exe", SafetyTier::Caution).unwrap();
    assert_eq!(f.os.lock().tasks[r"\vendor\updatetask"], false);

    f.manager.revert(&entry.id).unwrap();
    assert_eq!(f.os.lock().tasks[r"\vendor\updatetask"], true);
}

#[test]
fn test_ifeo_block_and_unblock() {
    let f = fixture();

    let entry = f.manager.suppress(ifeo_target(), "updater.exe", SafetyTier::Safe).unwrap();
    assert_eq!(entry.captured, CapturedState::IfeoDebugger { prior: None });
    assert_eq!(f.os.lock().ifeo["updater.exe"], FAKE_BLOCKER);

    f.manager.revert(&entry.id).unwrap();
    assert!(!f.os.lock().ifeo.contains_key("updater.exe"));
}

#[test]
fn test_ifeo_revert_keeps_preexisting_debugger() {
    let f = fixture();
    f.os.lock().ifeo.insert("updater.exe".to_string(), r"C:\Dbg\windbg.exe".to_string());

    let entry = f.manager.suppress(ifeo_target(), "updater.exe", SafetyTier::Safe).unwrap();
    assert_eq!(
        entry.captured,
        CapturedState::IfeoDebugger { prior: Some(r"C:\Dbg\windbg.exe".to_string()) }
    );
    assert_eq!(f.os.lock().ifeo["updater.exe"], FAKE_BLOCKER);

    f.manager.revert(&entry.id).unwrap();
    // The unrelated pre-existing debugger survives the revert
    assert_eq!(f.os.lock().ifeo["updater.exe"], r"C:\Dbg\windbg.exe");
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn test_suppress_is_idempotent() {
    let f = fixture();

    let first = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    let second = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();

    assert_eq!(first.id, second.id, "same entry id both times");
    assert_eq!(f.os.lock().disable_calls, 1, "mutation performed exactly once");
    // The original snapshot is preserved, not overwritten by a re-capture of
    // the already-disabled state
    assert_eq!(second.captured, CapturedState::ServiceStartMode { mode: ServiceStartMode::Auto });
    assert_eq!(f.manager.list_active().len(), 1);
}

#[test]
fn test_critical_targets_rejected_for_every_mechanism() {
    let f = fixture();

    for target in [service_target(), run_key_target(), task_target(), ifeo_target()] {
        let err = f.manager.suppress(target, "csrss.exe", SafetyTier::Critical).unwrap_err();
        assert!(matches!(err, SuppressionError::PolicyViolation(_)));
    }

    assert_eq!(f.os.lock().disable_calls, 0, "no mutation may reach the OS");
    assert!(f.manager.list_active().is_empty());
}

#[test]
fn test_revert_of_reverted_is_noop() {
    let f = fixture();

    let entry = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    f.manager.revert(&entry.id).unwrap();
    let restores_after_first = f.os.lock().restore_calls;

    let again = f.manager.revert(&entry.id).unwrap();
    assert_eq!(again.status, SuppressionStatus::Reverted);
    assert_eq!(f.os.lock().restore_calls, restores_after_first, "no second restore");
}

#[test]
fn test_revert_unknown_id_is_not_found() {
    let f = fixture();
    let err = f.manager.revert("no-such-entry").unwrap_err();
    assert!(matches!(err, SuppressionError::NotFound(_)));
}

#[test]
fn test_new_suppression_allowed_after_revert() {
    let f = fixture();

    let first = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    f.manager.revert(&first.id).unwrap();

    let second = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(f.manager.list_all().len(), 2);
    assert_eq!(f.manager.list_active().len(), 1);
}

#[test]
fn test_externally_deleted_service_yields_revert_failed() {
    // Suppress a service, delete it externally, then revert
    let f = fixture();

    let entry = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();
    f.os.lock().services.remove("updatersvc");

    let err = f.manager.revert(&entry.id).unwrap_err();
    assert!(matches!(err, SuppressionError::RevertFailed(_)));

    // The entry remains in the log with that status, never auto-dropped
    let logged = f.manager.get(&entry.id).unwrap();
    assert_eq!(logged.status, SuppressionStatus::RevertFailed);
    assert!(logged.last_error.is_some());
    assert!(f.manager.list_active().is_empty());

    // Manual remediation: the service comes back, an explicit revert succeeds
    f.os.lock().services.insert("updatersvc".to_string(), ServiceStartMode::Disabled);
    let recovered = f.manager.revert(&entry.id).unwrap();
    assert_eq!(recovered.status, SuppressionStatus::Reverted);
    assert_eq!(f.os.lock().services["updatersvc"], ServiceStartMode::Auto);
}

#[test]
fn test_suppress_missing_target_fails_cleanly() {
    let f = fixture();
    let err = f
        .manager
        .suppress(
            SuppressTarget::Service { name: "NoSuchSvc".to_string() },
            "ghost.exe",
            SafetyTier::Safe,
        )
        .unwrap_err();
    assert!(matches!(err, SuppressionError::NotFound(_)));
    assert!(f.manager.list_all().is_empty(), "failed capture leaves no entry");
}

// ============================================================================
// DURABILITY & AUDIT
// ============================================================================

#[test]
fn test_log_survives_manager_restart() {
    let f = fixture();
    let entry = f.manager.suppress(service_target(), "updater.exe", SafetyTier::Safe).unwrap();

    // New manager over the same store path = host application restart
    let store = SuppressionStore::load(f.dir.path().join("suppressions.json")).unwrap();
    let audit = AuditLog::open(f.dir.path().join("audit.jsonl")).unwrap();
    let reopened = SuppressionManager::new(store, audit, Box::new(FakeBackend(f.os.clone())));

    let active = reopened.list_active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, entry.id);

    // And the reloaded snapshot still reverts correctly
    reopened.revert(&entry.id).unwrap();
    assert_eq!(f.os.lock().services["updatersvc"], ServiceStartMode::Auto);
}

#[test]
fn test_audit_attempt_records_precede_outcomes() {
    let f = fixture();

    let entry = f.manager.suppress(run_key_target(), "updater.exe", SafetyTier::Safe).unwrap();
    f.manager.revert(&entry.id).unwrap();

    let content = std::fs::read_to_string(f.dir.path().join("audit.jsonl")).unwrap();
    let ops: Vec<String> = content
        .lines()
        .map(|line| {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            v["op"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(
        ops,
        vec!["SuppressAttempt", "SuppressApplied", "RevertAttempt", "RevertApplied"],
        "attempt records precede outcome records"
    );
}
