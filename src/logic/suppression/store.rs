//! Suppression Store - Durable log của mọi suppression entry
//!
//! JSON array trên disk, full scan khi load, atomic rewrite (temp + rename)
//! khi mutate. Status của entry mutable in place; entries không bao giờ bị
//! auto-delete; RevertFailed ở lại cho manual remediation.

use std::fs;
use std::path::PathBuf;
use parking_lot::Mutex;

use super::types::{SuppressionEntry, SuppressionError, SuppressionStatus};

// ============================================================================
// STORE
// ============================================================================

pub struct SuppressionStore {
    path: PathBuf,
    entries: Mutex<Vec<SuppressionEntry>>,
}

impl SuppressionStore {
    /// Load store từ disk. Missing file = empty store (first run).
    pub fn load(path: PathBuf) -> Result<Self, SuppressionError> {
        let entries = if path.exists() {
            let data = fs::read(&path)?;
            serde_json::from_slice(&data)?
        } else {
            Vec::new()
        };

        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Append một entry mới và persist ngay.
    pub fn append(&self, entry: SuppressionEntry) -> Result<(), SuppressionError> {
        let mut entries = self.entries.lock();
        entries.push(entry);
        self.persist(&entries)
    }

    /// Update status (và last_error) của một entry theo id, persist ngay.
    pub fn update_status(
        &self,
        id: &str,
        status: SuppressionStatus,
        last_error: Option<String>,
    ) -> Result<SuppressionEntry, SuppressionError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| SuppressionError::NotFound(format!("suppression entry '{}'", id)))?;

        entry.status = status;
        entry.last_error = last_error;
        let updated = entry.clone();

        self.persist(&entries)?;
        Ok(updated)
    }

    pub fn get(&self, id: &str) -> Option<SuppressionEntry> {
        self.entries.lock().iter().find(|e| e.id == id).cloned()
    }

    /// Entry Active cho một target key, nếu có. Per the invariant there is at
    /// most one; scanning newest-first keeps that true even over a log that
    /// predates the invariant.
    pub fn find_active(&self, target_key: &str) -> Option<SuppressionEntry> {
        self.entries
            .lock()
            .iter()
            .rev()
            .find(|e| e.status == SuppressionStatus::Active && e.target.key() == target_key)
            .cloned()
    }

    pub fn all(&self) -> Vec<SuppressionEntry> {
        self.entries.lock().clone()
    }

    pub fn active(&self) -> Vec<SuppressionEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.status == SuppressionStatus::Active)
            .cloned()
            .collect()
    }

    /// Atomic rewrite: write to a temp file in the same directory, then
    /// rename over the real one.
    fn persist(&self, entries: &[SuppressionEntry]) -> Result<(), SuppressionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::suppression::types::{
        CapturedState, Mechanism, ServiceStartMode, SuppressTarget,
    };
    use chrono::Utc;

    fn entry(id: &str, service: &str, status: SuppressionStatus) -> SuppressionEntry {
        SuppressionEntry {
            id: id.to_string(),
            process_name: format!("{}.exe", service),
            target: SuppressTarget::Service { name: service.to_string() },
            mechanism: Mechanism::Service,
            captured: CapturedState::ServiceStartMode { mode: ServiceStartMode::Auto },
            created_at: Utc::now(),
            status,
            last_error: None,
        }
    }

    #[test]
    fn test_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suppressions.json");

        {
            let store = SuppressionStore::load(path.clone()).unwrap();
            store.append(entry("a", "spooler", SuppressionStatus::Active)).unwrap();
            store.append(entry("b", "fax", SuppressionStatus::Active)).unwrap();
            store.update_status("b", SuppressionStatus::Reverted, None).unwrap();
        }

        let reloaded = SuppressionStore::load(path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("a").unwrap().status, SuppressionStatus::Active);
        assert_eq!(reloaded.get("b").unwrap().status, SuppressionStatus::Reverted);
    }

    #[test]
    fn test_find_active_ignores_reverted() {
        let dir = tempfile::tempdir().unwrap();
        let store = SuppressionStore::load(dir.path().join("s.json")).unwrap();

        store.append(entry("a", "spooler", SuppressionStatus::Reverted)).unwrap();
        assert!(store.find_active("service:spooler").is_none());

        store.append(entry("b", "spooler", SuppressionStatus::Active)).unwrap();
        let found = store.find_active("service:spooler").unwrap();
        assert_eq!(found.id, "b");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = SuppressionStore::load(dir.path().join("s.json")).unwrap();
        let err = store.update_status("nope", SuppressionStatus::Reverted, None).unwrap_err();
        assert!(matches!(err, SuppressionError::NotFound(_)));
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SuppressionStore::load(dir.path().join("does-not-exist.json")).unwrap();
        assert!(store.is_empty());
    }
}
