//! Collector Engine - Scan cycle & snapshot publication
//!
//! Mỗi cycle: enumerate processes qua sysinfo, build ProcessRecords mới
//! (immutable), resolve descriptions, classify, publish một
//! `Arc<ClassifiedSnapshot>`. Readers (UI layer) chỉ clone Arc; snapshot
//! không bao giờ mutate sau khi publish.
//!
//! Termination và suppression KHÔNG dùng cached snapshot này; chúng enumerate
//! lại live state lúc thực thi (see `live_records`).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System, Users};

use crate::constants::{self, SERVICE_MAP_REFRESH_CYCLES};
use crate::logic::process_intel::describe;
use crate::logic::process_intel::providers::{
    self, MetadataReader, SignatureProvider,
};
use crate::logic::process_intel::snapshot::ProcessSnapshot;
use crate::logic::process_intel::types::{
    ClassifiedProcess, ClassifiedSnapshot, Description, ProcessRecord,
};
use crate::logic::safety::classify_snapshot;

// ============================================================================
// STATE MANAGEMENT
// ============================================================================

static IS_RUNNING: AtomicBool = AtomicBool::new(false);
static SCAN_CYCLES: AtomicU64 = AtomicU64::new(0);

/// System info instance (reused across cycles for cpu deltas)
static SYSTEM: RwLock<Option<System>> = RwLock::new(None);

/// User table for owner resolution
static USERS: RwLock<Option<Users>> = RwLock::new(None);

/// PID -> hosted service names, refreshed every few cycles
static SERVICE_MAP: RwLock<Option<HashMap<u32, Vec<String>>>> = RwLock::new(None);

/// Latest published snapshot
static LATEST: RwLock<Option<Arc<ClassifiedSnapshot>>> = RwLock::new(None);

/// External collaborators (swappable before start, e.g. in integration tests)
static SIGNATURE_PROVIDER: RwLock<Option<Box<dyn SignatureProvider>>> = RwLock::new(None);
static METADATA_READER: RwLock<Option<Box<dyn MetadataReader>>> = RwLock::new(None);

// ============================================================================
// ERROR
// ============================================================================

#[derive(Debug)]
pub struct CollectorError(pub String);

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CollectorError: {}", self.0)
    }
}

impl std::error::Error for CollectorError {}

// ============================================================================
// CONTROL
// ============================================================================

fn init_system() {
    {
        let mut sys_guard = SYSTEM.write();
        if sys_guard.is_none() {
            let mut sys = System::new_all();
            sys.refresh_all();
            *sys_guard = Some(sys);
        }
    }
    {
        let mut users_guard = USERS.write();
        if users_guard.is_none() {
            *users_guard = Some(Users::new_with_refreshed_list());
        }
    }
    {
        let mut provider = SIGNATURE_PROVIDER.write();
        if provider.is_none() {
            *provider = Some(providers::default_signature_provider());
        }
    }
    {
        let mut reader = METADATA_READER.write();
        if reader.is_none() {
            *reader = Some(providers::default_metadata_reader());
        }
    }
}

pub async fn start() -> Result<bool, CollectorError> {
    if IS_RUNNING.load(Ordering::SeqCst) {
        return Err(CollectorError("Collector đang chạy".to_string()));
    }

    init_system();
    IS_RUNNING.store(true, Ordering::SeqCst);

    tokio::spawn(async move {
        collector_loop().await;
    });

    log::info!("Collector started (interval: {}s)", constants::get_scan_interval());
    Ok(true)
}

pub async fn stop() -> Result<bool, CollectorError> {
    if !IS_RUNNING.load(Ordering::SeqCst) {
        return Err(CollectorError("Collector không đang chạy".to_string()));
    }

    IS_RUNNING.store(false, Ordering::SeqCst);
    log::info!("Collector stopped");
    Ok(true)
}

pub fn is_running() -> bool {
    IS_RUNNING.load(Ordering::SeqCst)
}

async fn collector_loop() {
    log::info!("Collector loop started");

    while IS_RUNNING.load(Ordering::SeqCst) {
        if let Err(e) = collect_once() {
            log::error!("Scan cycle failed: {}", e);
        }

        tokio::time::sleep(Duration::from_secs(constants::get_scan_interval())).await;
    }

    log::info!("Collector loop stopped");
}

// ============================================================================
// SCAN CYCLE
// ============================================================================

/// Chạy một scan cycle đầy đủ và publish snapshot mới.
pub fn collect_once() -> Result<Arc<ClassifiedSnapshot>, CollectorError> {
    init_system();

    let cycle = SCAN_CYCLES.fetch_add(1, Ordering::SeqCst);

    // Refresh the svchost map on the first cycle and then periodically
    if cycle % SERVICE_MAP_REFRESH_CYCLES == 0 {
        refresh_service_map();
    }

    let records = {
        let mut sys_guard = SYSTEM.write();
        let sys = sys_guard
            .as_mut()
            .ok_or_else(|| CollectorError("System not initialized".to_string()))?;
        sys.refresh_processes();

        let users_guard = USERS.read();
        let service_map = SERVICE_MAP.read();
        let provider_guard = SIGNATURE_PROVIDER.read();

        build_records(
            sys,
            users_guard.as_ref(),
            service_map.as_ref(),
            provider_guard.as_deref(),
        )
    };

    let snapshot = ProcessSnapshot::from_records(records);

    // Describe, then classify (tier propagation needs the whole snapshot)
    let reader_guard = METADATA_READER.read();
    let reader: &dyn MetadataReader = reader_guard
        .as_deref()
        .unwrap_or(&providers::NullMetadataReader);

    let mut descriptions: HashMap<u32, Description> = HashMap::with_capacity(snapshot.len());
    for record in snapshot.records() {
        descriptions.insert(record.pid, describe::resolve(record, &snapshot, reader));
    }

    let verdicts = classify_snapshot(&snapshot, &descriptions);

    let mut processes: HashMap<u32, ClassifiedProcess> = HashMap::with_capacity(snapshot.len());
    for record in snapshot.records() {
        let pid = record.pid;
        let description =
            descriptions.remove(&pid).unwrap_or_else(|| Description::unknown(&record.name));
        let verdict = verdicts
            .get(&pid)
            .cloned()
            .expect("classify_snapshot covers every record");
        processes.insert(
            pid,
            ClassifiedProcess { record: record.clone(), description, verdict },
        );
    }

    let published = Arc::new(ClassifiedSnapshot {
        cycle,
        taken_at: Utc::now(),
        processes,
    });

    *LATEST.write() = Some(published.clone());
    log::debug!("Scan cycle {} published ({} processes)", cycle, published.len());

    Ok(published)
}

fn build_records(
    sys: &System,
    users: Option<&Users>,
    service_map: Option<&HashMap<u32, Vec<String>>>,
    signature_provider: Option<&dyn SignatureProvider>,
) -> Vec<ProcessRecord> {
    let mut records = Vec::with_capacity(sys.processes().len());

    for (pid, process) in sys.processes() {
        let pid_u32 = pid.as_u32();
        let name = process.name().to_string();
        if name.is_empty() {
            continue;
        }

        let exe_path = process.exe().map(|p| p.to_path_buf());

        let user = process.user_id().and_then(|uid| {
            users.and_then(|u| u.get_user_by_id(uid)).map(|u| u.name().to_string())
        });

        let signature = match (&exe_path, signature_provider) {
            (Some(path), Some(provider)) => providers::verify_cached(provider, path),
            _ => crate::logic::process_intel::types::SignatureStatus::Unknown,
        };

        let disk = process.disk_usage();

        let mut record = ProcessRecord::new(pid_u32, &name);
        record.parent_pid = process.parent().map(|p| p.as_u32());
        record.exe_path = exe_path;
        record.cmdline = process.cmd().join(" ");
        record.user = user;
        record.status = process.status().to_string();
        record.start_time = process.start_time() as i64;
        record.cpu_percent = process.cpu_usage();
        record.memory_mb = process.memory() as f64 / (1024.0 * 1024.0);
        record.disk_read_bytes = disk.total_read_bytes;
        record.disk_write_bytes = disk.total_written_bytes;
        record.hosted_services = service_map
            .and_then(|m| m.get(&pid_u32))
            .cloned()
            .unwrap_or_default();
        record.signature = signature;

        records.push(record);
    }

    records
}

// ============================================================================
// LIVE QUERIES (termination path, never the cached snapshot)
// ============================================================================

/// Enumerate live processes ngay bây giờ. Termination engine dùng hàm này để
/// build descendant set tại thời điểm thực thi.
pub fn live_records() -> Vec<ProcessRecord> {
    let sys = System::new_all();
    let users_guard = USERS.read();
    let service_map = SERVICE_MAP.read();
    build_records(&sys, users_guard.as_ref(), service_map.as_ref(), None)
}

/// PID còn sống không? Re-validation ngay trước mỗi kill.
pub fn pid_alive(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid))
}

// ============================================================================
// SERVICE MAP (svchost -> hosted services)
// ============================================================================

#[cfg(windows)]
fn refresh_service_map() {
    use crate::constants::OS_COMMAND_TIMEOUT_SECS;
    use crate::logic::oscmd::run_with_timeout;

    let output = match run_with_timeout(
        "powershell",
        &[
            "-NoProfile",
            "-Command",
            "Get-CimInstance Win32_Service | Where-Object { $_.ProcessId -gt 0 } | \
             Select-Object Name,ProcessId | ConvertTo-Csv -NoTypeInformation",
        ],
        Duration::from_secs(OS_COMMAND_TIMEOUT_SECS),
    ) {
        Ok(out) if out.success => out.stdout,
        Ok(out) => {
            log::warn!("Service map query failed: {}", out.stderr.trim());
            return;
        }
        Err(e) => {
            log::warn!("Service map query failed: {}", e);
            return;
        }
    };

    let mut map: HashMap<u32, Vec<String>> = HashMap::new();
    for line in output.lines().skip(1) {
        let mut parts = line.trim().trim_matches('"').splitn(2, "\",\"");
        let (Some(name), Some(pid_str)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let Ok(pid) = pid_str.trim_matches('"').parse::<u32>() {
            map.entry(pid).or_default().push(name.to_string());
        }
    }

    log::debug!("Service map refreshed: {} hosting processes", map.len());
    *SERVICE_MAP.write() = Some(map);
}

#[cfg(not(windows))]
fn refresh_service_map() {
    // No service control manager to query on this platform
    *SERVICE_MAP.write() = Some(HashMap::new());
}

// ============================================================================
// SNAPSHOT FEED & STATS
// ============================================================================

/// Snapshot mới nhất (read-only feed cho UI layer)
pub fn latest_snapshot() -> Option<Arc<ClassifiedSnapshot>> {
    LATEST.read().clone()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorStats {
    pub is_running: bool,
    pub cycles: u64,
    pub process_count: usize,
    pub last_scan: Option<DateTime<Utc>>,
}

pub fn stats() -> CollectorStats {
    let latest = LATEST.read();
    CollectorStats {
        is_running: is_running(),
        cycles: SCAN_CYCLES.load(Ordering::SeqCst),
        process_count: latest.as_ref().map(|s| s.len()).unwrap_or(0),
        last_scan: latest.as_ref().map(|s| s.taken_at),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_once_publishes_classified_snapshot() {
        let snapshot = collect_once().expect("scan cycle should succeed");
        assert!(!snapshot.is_empty(), "a live system has processes");

        // Every process got a description and a verdict
        for process in snapshot.processes.values() {
            assert!(!process.description.text.is_empty());
        }

        // The published feed matches what collect_once returned
        let latest = latest_snapshot().expect("snapshot was published");
        assert_eq!(latest.cycle, snapshot.cycle);
    }

    #[test]
    fn test_live_records_are_usable() {
        let records = live_records();
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| !r.name.is_empty()));
    }
}
