//! Suppression Audit Trail
//!
//! Append-only JSONL writer. Mọi mutation attempt được ghi TRƯỚC khi chạm
//! vào OS, không chỉ khi thành công: a crash mid-mutation must leave
//! evidence of intent. Flushed per record.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::types::Mechanism;

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOp {
    SuppressAttempt,
    SuppressApplied,
    SuppressFailed,
    RevertAttempt,
    RevertApplied,
    RevertFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub entry_id: String,
    pub target: String,
    pub mechanism: Mechanism,
    pub op: AuditOp,
    pub detail: String,
}

impl AuditRecord {
    pub fn new(entry_id: &str, target: &str, mechanism: Mechanism, op: AuditOp, detail: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            entry_id: entry_id.to_string(),
            target: target.to_string(),
            mechanism,
            op,
            detail: detail.to_string(),
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl AuditLog {
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        log::info!("Suppression audit trail: {:?}", path);

        Ok(Self { path, writer: Mutex::new(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one record and flush for durability.
    pub fn record(&self, record: &AuditRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let audit = AuditLog::open(path.clone()).unwrap();

        audit
            .record(&AuditRecord::new(
                "id-1",
                "service:spooler",
                Mechanism::Service,
                AuditOp::SuppressAttempt,
                "",
            ))
            .unwrap();
        audit
            .record(&AuditRecord::new(
                "id-1",
                "service:spooler",
                Mechanism::Service,
                AuditOp::SuppressApplied,
                "",
            ))
            .unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.op, AuditOp::SuppressAttempt);
        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.op, AuditOp::SuppressApplied);
    }
}
