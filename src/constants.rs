//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To change the scan cadence or timeouts, only edit this file.

use std::path::PathBuf;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "proc-warden";

/// Default scan interval (seconds)
pub const DEFAULT_SCAN_INTERVAL: u64 = 2;

/// How many scan cycles between svchost service-map refreshes
pub const SERVICE_MAP_REFRESH_CYCLES: u64 = 15;

/// Hard bound for any external OS command (sc / reg / schtasks / taskkill).
/// A command still running after this is killed and reported as a failure.
pub const OS_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Cap for parent-chain walks. PID reuse can make the parent graph cyclic,
/// so every traversal carries a visited set plus this depth bound.
pub const MAX_PARENT_DEPTH: usize = 64;

/// Maximum cached signature verdicts before eviction
pub const SIGNATURE_CACHE_MAX: usize = 1000;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get scan interval from environment or use default
pub fn get_scan_interval() -> u64 {
    std::env::var("WARDEN_SCAN_INTERVAL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SCAN_INTERVAL)
}

/// Base data directory for durable state (suppression log + audit trail)
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default path of the suppression store
pub fn suppression_store_path() -> PathBuf {
    data_dir().join("suppressions.json")
}

/// Default path of the suppression audit trail
pub fn suppression_audit_path() -> PathBuf {
    data_dir().join("suppression_audit.jsonl")
}
