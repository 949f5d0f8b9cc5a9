//! Process Intelligence Types - Shared Types

use std::collections::HashMap;
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::safety::types::SafetyVerdict;

// ============================================================================
// SIGNATURE TYPES
// ============================================================================

/// Kết quả kiểm tra chữ ký số (được cung cấp từ bên ngoài)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SignatureStatus {
    /// Có chữ ký hợp lệ từ publisher tin cậy
    SignedTrusted {
        publisher: String,
    },
    /// Có chữ ký nhưng publisher không quen biết
    SignedUnknown {
        publisher: String,
    },
    /// Không có chữ ký
    Unsigned,
    /// Không kiểm tra được (file missing, provider unavailable, ...)
    Unknown,
}

impl SignatureStatus {
    pub fn is_trusted(&self) -> bool {
        matches!(self, SignatureStatus::SignedTrusted { .. })
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            SignatureStatus::SignedTrusted { .. } | SignatureStatus::SignedUnknown { .. }
        )
    }

    /// Unsigned is a risk signal; Unknown is absence of signal, not risk.
    pub fn is_unsigned(&self) -> bool {
        matches!(self, SignatureStatus::Unsigned)
    }

    pub fn publisher(&self) -> Option<&str> {
        match self {
            SignatureStatus::SignedTrusted { publisher }
            | SignatureStatus::SignedUnknown { publisher } => Some(publisher),
            _ => None,
        }
    }
}

// ============================================================================
// PROCESS RECORD
// ============================================================================

/// Thông tin chi tiết về một process, thu thập mới mỗi scan cycle.
///
/// PIDs are recycled by the OS over time; a record is only meaningful within
/// the snapshot it was collected in. Records are never mutated after the
/// snapshot is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Weak reference: the parent may already be gone, or its PID reused.
    pub parent_pid: Option<u32>,
    pub name: String,
    pub exe_path: Option<PathBuf>,
    pub cmdline: String,
    pub user: Option<String>,
    /// Not exposed by every platform snapshot
    pub priority: Option<i32>,
    pub status: String,
    pub start_time: i64,

    // Sampled counters, refreshed each cycle
    pub cpu_percent: f32,
    pub memory_mb: f64,
    pub disk_read_bytes: u64,
    pub disk_write_bytes: u64,
    pub threads: Option<u32>,
    pub handles: Option<u32>,

    /// Service names hosted by this process (empty for non-hosts)
    pub hosted_services: Vec<String>,
    /// Supplied by the external signature-verification service
    pub signature: SignatureStatus,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: &str) -> Self {
        Self {
            pid,
            parent_pid: None,
            name: name.to_string(),
            exe_path: None,
            cmdline: String::new(),
            user: None,
            priority: None,
            status: String::new(),
            start_time: 0,
            cpu_percent: 0.0,
            memory_mb: 0.0,
            disk_read_bytes: 0,
            disk_write_bytes: 0,
            threads: None,
            handles: None,
            hosted_services: Vec::new(),
            signature: SignatureStatus::Unknown,
        }
    }

    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }

    /// Owner là account hệ thống (SYSTEM / LOCAL SERVICE / NETWORK SERVICE)?
    pub fn is_system_owned(&self) -> bool {
        match &self.user {
            Some(user) => {
                let upper = user.to_uppercase();
                upper.contains("SYSTEM")
                    || upper.contains("LOCAL SERVICE")
                    || upper.contains("NETWORK SERVICE")
                    || upper == "ROOT"
            }
            None => false,
        }
    }
}

// ============================================================================
// DESCRIPTION TYPES
// ============================================================================

/// Mức độ tin cậy của description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Direct fact-base hit for this exact executable
    Exact,
    /// Derived from command line, parent chain, or file metadata
    Inferred,
    /// Nothing matched
    Unknown,
}

/// Description dẫn xuất cho một process, chỉ có giá trị trong một scan cycle.
/// Never cached across cycles: PID reuse would attach it to the wrong process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Description {
    pub text: String,
    pub confidence: Confidence,
}

impl Description {
    pub fn exact(text: impl Into<String>) -> Self {
        Self { text: text.into(), confidence: Confidence::Exact }
    }

    pub fn inferred(text: impl Into<String>) -> Self {
        Self { text: text.into(), confidence: Confidence::Inferred }
    }

    pub fn unknown(name: &str) -> Self {
        Self {
            text: format!("{} — unknown purpose", name),
            confidence: Confidence::Unknown,
        }
    }
}

// ============================================================================
// CLASSIFIED SNAPSHOT (read-only feed for the UI layer)
// ============================================================================

/// Một process đã qua describe + classify
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedProcess {
    pub record: ProcessRecord,
    pub description: Description,
    pub verdict: SafetyVerdict,
}

/// Immutable kết quả của một scan cycle. Published behind an `Arc`;
/// concurrent readers clone the Arc and never need further locking.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedSnapshot {
    pub cycle: u64,
    pub taken_at: DateTime<Utc>,
    pub processes: HashMap<u32, ClassifiedProcess>,
}

impl ClassifiedSnapshot {
    pub fn get(&self, pid: u32) -> Option<&ClassifiedProcess> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
