//! Safety Classification Rules & Constants
//!
//! KHÔNG chứa logic classify - chỉ constants. Data ở đây là phần "most
//! specific" của rule ordering trong classifier.

/// PIDs the OS reserves for itself; always Critical regardless of name.
pub const RESERVED_SYSTEM_PIDS: &[u32] = &[0, 4];

/// Processes that are ALWAYS Critical regardless of the fact base.
/// Kernel, session managers, and core subsystems.
pub const ALWAYS_CRITICAL: &[&str] = &[
    "system",
    "registry",
    "memory compression",
    "ntoskrnl.exe",
    "smss.exe",
    "csrss.exe",
    "wininit.exe",
    "winlogon.exe",
    "services.exe",
    "lsass.exe",
    "lsaiso.exe",
    "dwm.exe",
    "fontdrvhost.exe",
    "trustedinstaller.exe",
];

/// Caution overrides: not critical, but killing them degrades the session.
/// Applied even when a fact-base category would say Safe.
pub const CAUTION_OVERRIDES: &[&str] = &[
    "explorer.exe",
    "spoolsv.exe",
    "searchindexer.exe",
    "audiodg.exe",
    "msmpeng.exe",
    "securityhealthservice.exe",
    "wlanext.exe",
    "nissrv.exe",
    "wudfhost.exe",
];

/// Services essential to the running session. A process hosting any of these
/// is Critical: stopping the host ends or cripples the session.
pub const ESSENTIAL_SESSION_SERVICES: &[&str] = &[
    "rpcss",
    "dcomlaunch",
    "plugplay",
    "power",
    "brokerinfrastructure",
    "profsvc",
    "usermanager",
    "gpsvc",
    "winmgmt",
    "cryptsvc",
    "sens",
    "eventlog",
    "schedule",
    "staterepository",
    "coremessagingregistrar",
];

/// Path fragments marking temporary or uncommon-writable directories.
/// An unsigned executable running from one of these is a risk signal.
pub const SUSPICIOUS_PATH_FRAGMENTS: &[&str] = &[
    r"\temp\",
    r"\tmp\",
    r"\appdata\local\temp",
    r"\downloads\",
    r"\desktop\",
    r"\users\public\",
    r"\recycler\",
    r"\$recycle.bin\",
    "/tmp/",
    "/dev/shm/",
    "/var/tmp/",
];

/// Impact text for rule 1 (fixed critical-name list)
pub const CRITICAL_IMPACT: &str =
    "Terminating this will crash or destabilize the operating system.";

/// Impact text for the default rule (nothing matched)
pub const UNKNOWN_IMPACT: &str =
    "Unknown process. No safety information available; treat with caution.";

// ============================================================================
// PREDICATE HELPERS (pure, data-driven)
// ============================================================================

pub fn is_always_critical(name_lower: &str) -> bool {
    ALWAYS_CRITICAL.contains(&name_lower)
}

pub fn is_caution_override(name_lower: &str) -> bool {
    CAUTION_OVERRIDES.contains(&name_lower)
}

pub fn is_essential_service(service_name: &str) -> bool {
    let lower = service_name.to_lowercase();
    ESSENTIAL_SESSION_SERVICES.contains(&lower.as_str())
}

pub fn in_suspicious_path(path_lower: &str) -> bool {
    SUSPICIOUS_PATH_FRAGMENTS.iter().any(|fragment| path_lower.contains(fragment))
}
