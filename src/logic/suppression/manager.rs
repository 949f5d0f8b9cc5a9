//! Suppression Manager - Reversible respawn prevention
//!
//! Giữ mọi invariant của suppression log:
//! - At most one Active entry per target (idempotent suppress)
//! - Critical-tier targets bị từ chối (PolicyViolation)
//! - Revert-of-reverted là no-op, RevertFailed ở lại cho manual remediation
//! - Mọi mutation attempt được audit TRƯỚC khi chạm OS
//!
//! Per-target serialization: operations on the same target take the target's
//! lock; different targets proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::constants;
use crate::logic::safety::SafetyTier;

use super::audit::{AuditLog, AuditOp, AuditRecord};
use super::backend::{MechanismBackend, OsBackend};
use super::store::SuppressionStore;
use super::types::{SuppressTarget, SuppressionEntry, SuppressionError, SuppressionStatus};

// ============================================================================
// MANAGER
// ============================================================================

pub struct SuppressionManager {
    store: SuppressionStore,
    audit: AuditLog,
    backend: Box<dyn MechanismBackend>,
    target_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SuppressionManager {
    /// Explicitly injectable constructor; tests pass a fake backend and
    /// tempdir-backed store/audit paths.
    pub fn new(store: SuppressionStore, audit: AuditLog, backend: Box<dyn MechanismBackend>) -> Self {
        Self { store, audit, backend, target_locks: Mutex::new(HashMap::new()) }
    }

    /// Production instance: OS backend + default durable paths.
    pub fn open_default() -> Result<Self, SuppressionError> {
        let store = SuppressionStore::load(constants::suppression_store_path())?;
        let audit = AuditLog::open(constants::suppression_audit_path())?;
        log::info!(
            "Suppression store loaded: {} entries ({} active)",
            store.len(),
            store.active().len()
        );
        Ok(Self::new(store, audit, Box::new(OsBackend)))
    }

    /// Serialize per target: one in-flight operation per target key.
    fn lock_for(&self, target_key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.target_locks.lock();
        locks.entry(target_key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    // ------------------------------------------------------------------------
    // SUPPRESS
    // ------------------------------------------------------------------------

    /// Apply một suppression cho target. `tier` là tier hiện tại của process
    /// mà suppression này nhắm tới (caller lấy từ scan mới nhất).
    pub fn suppress(
        &self,
        target: SuppressTarget,
        process_name: &str,
        tier: SafetyTier,
    ) -> Result<SuppressionEntry, SuppressionError> {
        if tier == SafetyTier::Critical {
            log::warn!(
                "Refusing suppression of {} — {} is Critical",
                target.display(),
                process_name
            );
            return Err(SuppressionError::PolicyViolation(format!(
                "{} is a critical system process and cannot be suppressed",
                process_name
            )));
        }

        let key = target.key();
        let lock = self.lock_for(&key);
        let _guard = lock.lock();

        // Idempotent: an Active entry for this target is returned unchanged.
        // The original snapshot stays authoritative; no second mutation.
        if let Some(existing) = self.store.find_active(&key) {
            log::info!("Suppression for {} already active ({})", target.display(), existing.id);
            return Ok(existing);
        }

        // Capture before mutating; this snapshot is what revert will replay.
        let captured = self.backend.capture(&target)?;

        let entry_id = Uuid::new_v4().to_string();
        let mechanism = target.mechanism();

        // Intent first, mutation second.
        self.audit.record(&AuditRecord::new(
            &entry_id,
            &key,
            mechanism,
            AuditOp::SuppressAttempt,
            process_name,
        ))?;

        if let Err(e) = self.backend.disable(&target) {
            let _ = self.audit.record(&AuditRecord::new(
                &entry_id,
                &key,
                mechanism,
                AuditOp::SuppressFailed,
                &e.to_string(),
            ));
            return Err(e);
        }

        let entry = SuppressionEntry {
            id: entry_id.clone(),
            process_name: process_name.to_string(),
            target,
            mechanism,
            captured,
            created_at: chrono::Utc::now(),
            status: SuppressionStatus::Active,
            last_error: None,
        };

        self.store.append(entry.clone())?;
        self.audit.record(&AuditRecord::new(
            &entry_id,
            &key,
            mechanism,
            AuditOp::SuppressApplied,
            "",
        ))?;

        log::info!("Suppressed {} (entry {})", entry.target.display(), entry.id);
        Ok(entry)
    }

    // ------------------------------------------------------------------------
    // REVERT
    // ------------------------------------------------------------------------

    /// Revert một entry theo id, replay captured snapshot.
    ///
    /// Reverted entries are a no-op. RevertFailed entries may be retried here
    /// (an explicit call is manual remediation; the system itself never
    /// retries them).
    pub fn revert(&self, entry_id: &str) -> Result<SuppressionEntry, SuppressionError> {
        let entry = self
            .store
            .get(entry_id)
            .ok_or_else(|| SuppressionError::NotFound(format!("suppression entry '{}'", entry_id)))?;

        let key = entry.target.key();
        let lock = self.lock_for(&key);
        let _guard = lock.lock();

        // Re-read under the target lock; a concurrent revert may have won.
        let entry = self
            .store
            .get(entry_id)
            .ok_or_else(|| SuppressionError::NotFound(format!("suppression entry '{}'", entry_id)))?;

        if entry.status == SuppressionStatus::Reverted {
            return Ok(entry);
        }

        self.audit.record(&AuditRecord::new(
            &entry.id,
            &key,
            entry.mechanism,
            AuditOp::RevertAttempt,
            "",
        ))?;

        match self.backend.restore(&entry.target, &entry.captured) {
            Ok(()) => {
                let updated =
                    self.store.update_status(&entry.id, SuppressionStatus::Reverted, None)?;
                self.audit.record(&AuditRecord::new(
                    &entry.id,
                    &key,
                    entry.mechanism,
                    AuditOp::RevertApplied,
                    "",
                ))?;
                log::info!("Reverted suppression of {} ({})", entry.target.display(), entry.id);
                Ok(updated)
            }
            Err(e) => {
                let message = e.to_string();
                // Never silently drop the entry: it stays visible as
                // RevertFailed until someone remediates by hand.
                self.store.update_status(
                    &entry.id,
                    SuppressionStatus::RevertFailed,
                    Some(message.clone()),
                )?;
                let _ = self.audit.record(&AuditRecord::new(
                    &entry.id,
                    &key,
                    entry.mechanism,
                    AuditOp::RevertFailed,
                    &message,
                ));
                log::error!(
                    "Revert failed for {} ({}): {}",
                    entry.target.display(),
                    entry.id,
                    message
                );
                Err(SuppressionError::RevertFailed(message))
            }
        }
    }

    // ------------------------------------------------------------------------
    // QUERIES
    // ------------------------------------------------------------------------

    /// Entries đang Active (cho audit / UI)
    pub fn list_active(&self) -> Vec<SuppressionEntry> {
        self.store.active()
    }

    /// Toàn bộ log, mọi status
    pub fn list_all(&self) -> Vec<SuppressionEntry> {
        self.store.all()
    }

    pub fn get(&self, entry_id: &str) -> Option<SuppressionEntry> {
        self.store.get(entry_id)
    }
}
