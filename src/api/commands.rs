//! API Commands - Bề mặt cho UI layer
//!
//! UI (out of scope) gọi các hàm ở đây; errors được map về String tại
//! boundary này, typed errors sống trong `logic`.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::collector;
use crate::logic::config::SafetyConfig;
use crate::logic::process_intel::facts;
use crate::logic::process_intel::types::ClassifiedSnapshot;
use crate::logic::response::{terminate_tree, TerminationReport};
use crate::logic::safety::SafetyTier;
use crate::logic::suppression::{SuppressTarget, SuppressionEntry, SuppressionManager};

// ============================================================================
// SUPPRESSION MANAGER INSTANCE
// ============================================================================

static MANAGER: Lazy<Option<SuppressionManager>> =
    Lazy::new(|| match SuppressionManager::open_default() {
        Ok(manager) => Some(manager),
        Err(e) => {
            log::error!("Suppression manager unavailable: {}", e);
            None
        }
    });

fn manager() -> Result<&'static SuppressionManager, String> {
    MANAGER.as_ref().ok_or_else(|| "suppression store unavailable".to_string())
}

/// Force-initialize durable state at startup so failures surface early.
pub fn init() -> Result<(), String> {
    manager().map(|_| ())
}

// ============================================================================
// STATUS
// ============================================================================

/// Trạng thái hệ thống cho UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub is_scanning: bool,
    pub scan_cycles: u64,
    pub process_count: usize,
    pub last_scan_time: Option<String>,
    pub active_suppressions: usize,
    pub revert_failures: usize,
}

pub fn system_status() -> SystemStatus {
    let stats = collector::stats();
    let (active, failed) = match MANAGER.as_ref() {
        Some(manager) => {
            let all = manager.list_all();
            let failed = all
                .iter()
                .filter(|e| {
                    e.status == crate::logic::suppression::SuppressionStatus::RevertFailed
                })
                .count();
            (manager.list_active().len(), failed)
        }
        None => (0, 0),
    };

    SystemStatus {
        version: constants::APP_VERSION.to_string(),
        is_scanning: stats.is_running,
        scan_cycles: stats.cycles,
        process_count: stats.process_count,
        last_scan_time: stats.last_scan.map(|t| t.to_rfc3339()),
        active_suppressions: active,
        revert_failures: failed,
    }
}

// ============================================================================
// SNAPSHOT FEED
// ============================================================================

/// Snapshot mới nhất đã classify. Immutable; readers giữ Arc tùy ý.
pub fn get_snapshot() -> Result<Arc<ClassifiedSnapshot>, String> {
    collector::latest_snapshot().ok_or_else(|| "no scan cycle has completed yet".to_string())
}

// ============================================================================
// TERMINATION
// ============================================================================

/// Dừng một process và descendants của nó.
/// `confirmed` đến từ dialog của UI; `override_critical` chỉ cho Critical tier.
pub fn request_termination(
    pid: u32,
    confirmed: bool,
    override_critical: bool,
) -> Result<TerminationReport, String> {
    if !SafetyConfig::is_termination_enabled() {
        return Err("termination is disabled by safety config".to_string());
    }

    Ok(terminate_tree(pid, confirmed, override_critical))
}

// ============================================================================
// SUPPRESSION
// ============================================================================

/// Apply một suppression. Tier của process đích được lấy từ scan mới nhất
/// (fallback: fact base), rồi manager enforce policy.
pub fn request_suppression(
    target: SuppressTarget,
    process_name: &str,
) -> Result<SuppressionEntry, String> {
    if !SafetyConfig::is_suppression_enabled() {
        return Err("suppression is disabled by safety config".to_string());
    }

    let tier = tier_for_process(process_name);
    manager()?.suppress(target, process_name, tier).map_err(|e| e.to_string())
}

pub fn request_revert(entry_id: &str) -> Result<SuppressionEntry, String> {
    manager()?.revert(entry_id).map_err(|e| e.to_string())
}

pub fn list_suppression_log() -> Result<Vec<SuppressionEntry>, String> {
    Ok(manager()?.list_all())
}

pub fn list_active_suppressions() -> Result<Vec<SuppressionEntry>, String> {
    Ok(manager()?.list_active())
}

/// Tier hiện tại của một process name: max tier quan sát được trong scan
/// mới nhất, fallback về fact base, cuối cùng Caution (unknown không bao
/// giờ là Safe ngầm định).
fn tier_for_process(process_name: &str) -> SafetyTier {
    let name_lower = process_name.to_lowercase();

    if let Some(snapshot) = collector::latest_snapshot() {
        let observed = snapshot
            .processes
            .values()
            .filter(|p| p.record.name_lower() == name_lower)
            .map(|p| p.verdict.tier)
            .max();
        if let Some(tier) = observed {
            return tier;
        }
    }

    match facts::lookup(&name_lower) {
        Some(fact) => fact.tier,
        None => SafetyTier::Caution,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_for_process_falls_back_to_fact_base() {
        // No scan has necessarily run; lsass is Critical straight from facts
        assert_eq!(tier_for_process("lsass.exe"), SafetyTier::Critical);
        assert_eq!(tier_for_process("unheard-of.exe"), SafetyTier::Caution);
    }
}
