//! Suppression Types - Shared types cho respawn prevention
//!
//! Bốn cơ chế respawn (service, run key, scheduled task, IFEO) là bốn state
//! machine giống nhau về cấu trúc; types ở đây giữ phần chung: target,
//! captured snapshot, entry lifecycle Active -> Reverted / RevertFailed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// MECHANISM & TARGET
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mechanism {
    Service,
    RunKey,
    ScheduledTask,
    Ifeo,
}

impl Mechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mechanism::Service => "service",
            Mechanism::RunKey => "run-key",
            Mechanism::ScheduledTask => "scheduled-task",
            Mechanism::Ifeo => "ifeo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryHive {
    CurrentUser,
    LocalMachine,
}

impl RegistryHive {
    pub fn prefix(&self) -> &'static str {
        match self {
            RegistryHive::CurrentUser => "HKCU",
            RegistryHive::LocalMachine => "HKLM",
        }
    }
}

/// Target của một suppression. The variant IS the mechanism: a service name
/// can only be suppressed through the service controller, so an inconsistent
/// (target, mechanism) pair is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressTarget {
    /// Windows service, addressed by short service name
    Service { name: String },
    /// Autorun value under a Run registry key
    RunKey { hive: RegistryHive, value_name: String },
    /// Scheduled task, addressed by full task path
    ScheduledTask { path: String },
    /// Image File Execution Options debugger block for an executable name
    Ifeo { exe_name: String },
}

impl SuppressTarget {
    pub fn mechanism(&self) -> Mechanism {
        match self {
            SuppressTarget::Service { .. } => Mechanism::Service,
            SuppressTarget::RunKey { .. } => Mechanism::RunKey,
            SuppressTarget::ScheduledTask { .. } => Mechanism::ScheduledTask,
            SuppressTarget::Ifeo { .. } => Mechanism::Ifeo,
        }
    }

    /// Stable identity key. Per-target serialization and the at-most-one-
    /// Active invariant both hash on this.
    pub fn key(&self) -> String {
        match self {
            SuppressTarget::Service { name } => format!("service:{}", name.to_lowercase()),
            SuppressTarget::RunKey { hive, value_name } => {
                format!("run-key:{}:{}", hive.prefix().to_lowercase(), value_name.to_lowercase())
            }
            SuppressTarget::ScheduledTask { path } => {
                format!("scheduled-task:{}", path.to_lowercase())
            }
            SuppressTarget::Ifeo { exe_name } => format!("ifeo:{}", exe_name.to_lowercase()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            SuppressTarget::Service { name } => format!("service '{}'", name),
            SuppressTarget::RunKey { hive, value_name } => {
                format!("{} run key '{}'", hive.prefix(), value_name)
            }
            SuppressTarget::ScheduledTask { path } => format!("scheduled task '{}'", path),
            SuppressTarget::Ifeo { exe_name } => format!("IFEO block for '{}'", exe_name),
        }
    }
}

// ============================================================================
// CAPTURED STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStartMode {
    Auto,
    Manual,
    Disabled,
}

impl ServiceStartMode {
    /// Argument for `sc config <name> start= <value>`
    pub fn sc_arg(&self) -> &'static str {
        match self {
            ServiceStartMode::Auto => "auto",
            ServiceStartMode::Manual => "demand",
            ServiceStartMode::Disabled => "disabled",
        }
    }
}

/// Pre-mutation snapshot, đủ để restore chính xác trạng thái cũ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturedState {
    /// Service start mode before it was set to Disabled
    ServiceStartMode { mode: ServiceStartMode },
    /// Prior run-key value, or None when the value did not exist
    RunKeyValue { prior: Option<String> },
    /// Scheduled-task enabled flag before suppression
    TaskEnabled { enabled: bool },
    /// Pre-existing debugger value (rare), or None when this suppression
    /// created the entry. Revert must never destroy an unrelated debugger.
    IfeoDebugger { prior: Option<String> },
}

// ============================================================================
// ENTRY LIFECYCLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionStatus {
    Active,
    Reverted,
    /// Restore failed; kept in the log for manual remediation, never
    /// auto-retried.
    RevertFailed,
}

/// Một mutation đã apply, sở hữu độc quyền bởi SuppressionManager.
/// Persisted; survives restarts of the host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub id: String,
    /// The process this suppression protects against (display only)
    pub process_name: String,
    pub target: SuppressTarget,
    pub mechanism: Mechanism,
    pub captured: CapturedState,
    pub created_at: DateTime<Utc>,
    pub status: SuppressionStatus,
    /// Last revert error for RevertFailed entries
    pub last_error: Option<String>,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum SuppressionError {
    /// Target no longer exists at execution time
    NotFound(String),
    /// Insufficient privilege for the mutation
    AccessDenied(String),
    /// Critical-tier target, or another policy gate refused the operation
    PolicyViolation(String),
    /// The bounded OS call did not finish in time
    Timeout(String),
    /// Snapshot restoration could not complete; entry keeps RevertFailed
    RevertFailed(String),
    /// Durable store or audit trail failure
    Store(String),
    /// Any other backend failure
    Backend(String),
}

impl std::fmt::Display for SuppressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressionError::NotFound(msg) => write!(f, "Not found: {}", msg),
            SuppressionError::AccessDenied(msg) => write!(f, "Access denied: {}", msg),
            SuppressionError::PolicyViolation(msg) => write!(f, "Policy violation: {}", msg),
            SuppressionError::Timeout(msg) => write!(f, "Timed out: {}", msg),
            SuppressionError::RevertFailed(msg) => write!(f, "Revert failed: {}", msg),
            SuppressionError::Store(msg) => write!(f, "Store error: {}", msg),
            SuppressionError::Backend(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for SuppressionError {}

impl From<std::io::Error> for SuppressionError {
    fn from(err: std::io::Error) -> Self {
        SuppressionError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SuppressionError {
    fn from(err: serde_json::Error) -> Self {
        SuppressionError::Store(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_key_is_case_insensitive() {
        let a = SuppressTarget::Service { name: "Spooler".to_string() };
        let b = SuppressTarget::Service { name: "spooler".to_string() };
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_target_keys_distinguish_mechanisms() {
        let service = SuppressTarget::Service { name: "updater".to_string() };
        let ifeo = SuppressTarget::Ifeo { exe_name: "updater".to_string() };
        assert_ne!(service.key(), ifeo.key());
    }

    #[test]
    fn test_run_key_hives_are_distinct_targets() {
        let hkcu = SuppressTarget::RunKey {
            hive: RegistryHive::CurrentUser,
            value_name: "OneDrive".to_string(),
        };
        let hklm = SuppressTarget::RunKey {
            hive: RegistryHive::LocalMachine,
            value_name: "OneDrive".to_string(),
        };
        assert_ne!(hkcu.key(), hklm.key());
    }

    #[test]
    fn test_entry_roundtrips_through_json() {
        let entry = SuppressionEntry {
            id: "abc".to_string(),
            process_name: "updater.exe".to_string(),
            target: SuppressTarget::RunKey {
                hive: RegistryHive::CurrentUser,
                value_name: "Updater".to_string(),
            },
            mechanism: Mechanism::RunKey,
            captured: CapturedState::RunKeyValue {
                prior: Some(r"C:\Tools\updater.exe /background".to_string()),
            },
            created_at: Utc::now(),
            status: SuppressionStatus::Active,
            last_error: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: SuppressionEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, entry.id);
        assert_eq!(back.target, entry.target);
        assert_eq!(back.status, SuppressionStatus::Active);
    }
}
