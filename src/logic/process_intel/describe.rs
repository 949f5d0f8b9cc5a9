//! Description Resolver - Suy ra mô tả thân thiện cho một process
//!
//! Thứ tự ưu tiên (first match wins):
//! 1. Fact base exact match (executable + publisher)        -> Exact
//! 2. Command-line signature của các multi-role hosts       -> Inferred
//! 3. Parent-process context cho helper processes           -> Inferred
//! 4. File metadata (publisher / product string)            -> Inferred
//! 5. "<name> — unknown purpose"                            -> Unknown
//!
//! Pure function of its inputs plus the immutable fact base. Conflicting
//! signals (fact-base hit + a risky command-line token) lower the confidence;
//! tier decisions stay in the classifier.

use once_cell::sync::Lazy;
use regex::Regex;

use super::facts;
use super::providers::MetadataReader;
use super::snapshot::ProcessSnapshot;
use super::types::{Confidence, Description, ProcessRecord};

// ============================================================================
// PATTERN TABLES
// ============================================================================

/// Helper executables mô tả theo app mà chúng phục vụ (qua parent)
const HELPER_PROCESSES: &[&str] = &[
    "conhost.exe",
    "crashpad_handler.exe",
    "msedgewebview2.exe",
    "runtimebroker.exe",
    "dllhost.exe",
    "backgroundtaskhost.exe",
    "werfault.exe",
    "werfaultsecure.exe",
];

/// Command-line tokens that contradict a benign fact-base entry. A hit does
/// not change the description, only drops Exact confidence to Inferred.
const RISKY_CMDLINE_TOKENS: &[&str] = &[
    "-encodedcommand",
    "-enc ",
    "frombase64string",
    "downloadstring",
    "invoke-expression",
    "iex(",
    "-nop ",
    "-windowstyle hidden",
];

static RE_WEBVIEW_APP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"--webview-exe-name=(\S+)").unwrap());
static RE_SVCHOST_SERVICE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-s\s+(\S+)").unwrap());
static RE_JAVA_JAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"-jar\s+"?([^"\s]+)"#).unwrap());
static RE_JAVA_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)([a-zA-Z_]\w*(?:\.[a-zA-Z_]\w*)+)\s*$").unwrap());
static RE_PS_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)-(?:file|f)\s+"?([^"\s]+)"#).unwrap());
static RE_DLL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\w+\.dll)").unwrap());

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolve description cho một record trong context của snapshot hiện tại.
pub fn resolve(
    record: &ProcessRecord,
    snapshot: &ProcessSnapshot,
    metadata: &dyn MetadataReader,
) -> Description {
    let name_lower = record.name_lower();
    let fact = facts::lookup(&name_lower);

    // 1. Exact fact-base match. Multi-role hosts fall through to the
    //    command-line analyzer first; their canonical text is a fallback.
    if let Some(fact) = fact {
        if !fact.multi_role {
            if publisher_conflicts(record, fact.publisher) {
                // Name matches a known binary but the signer disagrees:
                // surface the canonical text with lowered confidence.
                return Description::inferred(fact.description);
            }
            if has_risky_token(&record.cmdline) {
                return Description::inferred(fact.description);
            }
            return Description::exact(fact.description);
        }
    }

    // 2. Command-line signatures for multi-purpose hosts
    if !record.cmdline.is_empty() {
        if let Some(text) = describe_from_cmdline(&name_lower, record) {
            return Description::inferred(text);
        }
    }

    // svchost without a -s flag: describe by the services it hosts
    if name_lower == "svchost.exe" && !record.hosted_services.is_empty() {
        let descs: Vec<String> = record
            .hosted_services
            .iter()
            .take(3)
            .map(|s| facts::service_description(s))
            .collect();
        return Description::inferred(format!("Service Host: {}", descs.join(" | ")));
    }

    // 3. Helper processes: describe what they are serving
    if HELPER_PROCESSES.contains(&name_lower.as_str()) {
        if let Some(parent) = snapshot.parent_of(record.pid) {
            let parent_app = facts::parent_app_name(&parent.name);
            if let Some(text) = describe_helper(&name_lower, &parent_app) {
                return Description::inferred(text);
            }
        }
    }

    // Multi-role fact entry with no recognizable role or parent context:
    // fall back to its canonical description
    if let Some(fact) = fact {
        let lowered = has_risky_token(&record.cmdline) || publisher_conflicts(record, fact.publisher);
        return Description {
            text: fact.description.to_string(),
            confidence: if lowered { Confidence::Inferred } else { Confidence::Exact },
        };
    }

    // 4. File metadata fallback
    if let Some(path) = &record.exe_path {
        if let Some(file_desc) = metadata.file_description(path) {
            if let Some(parent) = snapshot.parent_of(record.pid) {
                let parent_lower = parent.name_lower();
                // Launch context only adds signal for non-infrastructure parents
                if !matches!(
                    parent_lower.as_str(),
                    "explorer.exe" | "services.exe" | "svchost.exe" | "wininit.exe"
                ) {
                    let parent_app = facts::parent_app_name(&parent.name);
                    return Description::inferred(format!(
                        "{} (launched by {})",
                        file_desc, parent_app
                    ));
                }
            }
            return Description::inferred(file_desc);
        }
        if let Some(company) = metadata.company_name(path) {
            return Description::inferred(format!("{} — application by {}", record.name, company));
        }
    }

    // Last bit of context before giving up: a known parent
    if let Some(parent) = snapshot.parent_of(record.pid) {
        if facts::lookup(&parent.name_lower()).is_some() {
            let parent_app = facts::parent_app_name(&parent.name);
            return Description::inferred(format!(
                "{} — helper process for {}",
                record.name, parent_app
            ));
        }
    }

    // 5. Unknown
    Description::unknown(&record.name)
}

// ============================================================================
// COMMAND-LINE ANALYSIS
// ============================================================================

/// Phân tích command line của các multi-role hosts.
/// Returns None when no signature matches.
fn describe_from_cmdline(name_lower: &str, record: &ProcessRecord) -> Option<String> {
    let cmdline = record.cmdline.as_str();
    let cmd_lower = cmdline.to_lowercase();

    // --- Chromium family (chrome / edge / brave / opera / vivaldi) ---
    if matches!(
        name_lower,
        "chrome.exe" | "msedge.exe" | "brave.exe" | "opera.exe" | "vivaldi.exe"
    ) {
        let browser = facts::parent_app_name(name_lower);
        if cmd_lower.contains("--type=renderer") {
            return Some(format!("{} — Tab renderer (displays a web page)", browser));
        }
        if cmd_lower.contains("--type=gpu-process") {
            return Some(format!("{} — GPU process (hardware-accelerated graphics)", browser));
        }
        if cmd_lower.contains("--type=utility") {
            if cmd_lower.contains("network") {
                return Some(format!("{} — Network service (handles all web requests)", browser));
            }
            if cmd_lower.contains("audio") {
                return Some(format!("{} — Audio service (plays sounds from web pages)", browser));
            }
            if cmd_lower.contains("storage") {
                return Some(format!("{} — Storage service (manages cookies, cache, etc.)", browser));
            }
            return Some(format!("{} — Utility process (background helper)", browser));
        }
        if cmd_lower.contains("--type=crashpad-handler") {
            return Some(format!("{} — Crash reporter", browser));
        }
        if cmd_lower.contains("--type=broker") {
            return Some(format!("{} — Security broker (manages sandbox permissions)", browser));
        }
        if !cmd_lower.contains("--type=") {
            return Some(format!("{} — Main browser process (manages all tabs and extensions)", browser));
        }
    }

    // --- VS Code ---
    if name_lower == "code.exe" {
        if cmd_lower.contains("--type=renderer") {
            return Some("VS Code — Editor window renderer".to_string());
        }
        if cmd_lower.contains("--type=gpu-process") {
            return Some("VS Code — GPU acceleration process".to_string());
        }
        if cmd_lower.contains("extensionhost") {
            return Some("VS Code — Extension Host (runs all your extensions)".to_string());
        }
        if cmd_lower.contains("--type=utility") {
            return Some("VS Code — Utility helper process".to_string());
        }
        if !cmd_lower.contains("--type=") {
            return Some("VS Code — Main process".to_string());
        }
    }

    // --- Edge WebView2 ---
    if name_lower == "msedgewebview2.exe" {
        if cmd_lower.contains("--type=renderer") {
            return Some("Edge WebView2 — Rendering web content for an app".to_string());
        }
        if cmd_lower.contains("--type=gpu-process") {
            return Some("Edge WebView2 — GPU acceleration for embedded web content".to_string());
        }
        if let Some(caps) = RE_WEBVIEW_APP.captures(cmdline) {
            return Some(format!("Edge WebView2 — Embedded browser for {}", &caps[1]));
        }
    }

    // --- Python ---
    if name_lower == "python.exe" || name_lower == "pythonw.exe" {
        let parts: Vec<&str> = cmdline.split_whitespace().collect();
        for (idx, part) in parts.iter().enumerate().skip(1) {
            let p = part.trim_matches('"').trim_matches('\'');
            if p.ends_with(".py") || p.ends_with(".pyw") {
                return Some(format!("Python — Running script: {}", basename(p)));
            }
            if p == "-m" {
                if let Some(module) = parts.get(idx + 1) {
                    return Some(format!("Python — Running module: {}", module.trim_matches('"')));
                }
            }
            if p == "-c" {
                return Some("Python — Running inline code".to_string());
            }
        }
        return Some("Python — Interpreter running".to_string());
    }

    // --- Node.js ---
    if name_lower == "node.exe" {
        for part in cmdline.split_whitespace().skip(1) {
            let p = part.trim_matches('"').trim_matches('\'');
            if p.ends_with(".js") || p.ends_with(".mjs") || p.ends_with(".ts") {
                return Some(format!("Node.js — Running: {}", basename(p)));
            }
        }
        if cmd_lower.contains("npm") {
            return Some("Node.js — Running npm (package manager)".to_string());
        }
        if cmd_lower.contains("npx") {
            return Some("Node.js — Running npx command".to_string());
        }
        return Some("Node.js — JavaScript runtime".to_string());
    }

    // --- Java ---
    if name_lower == "java.exe" || name_lower == "javaw.exe" {
        if cmd_lower.contains("minecraft") {
            return Some("Java — Running Minecraft".to_string());
        }
        if cmd_lower.contains("eclipse") {
            return Some("Java — Running Eclipse IDE".to_string());
        }
        if let Some(caps) = RE_JAVA_JAR.captures(cmdline) {
            return Some(format!("Java — Running: {}", basename(&caps[1])));
        }
        if let Some(caps) = RE_JAVA_CLASS.captures(cmdline) {
            return Some(format!("Java — Running class: {}", &caps[1]));
        }
    }

    // --- cmd.exe ---
    if name_lower == "cmd.exe" {
        for flag in ["/c ", "/k "] {
            if let Some(pos) = cmd_lower.find(flag) {
                let start = pos + flag.len();
                // Index came from the lowercased copy; only slice the original
                // when it still lands on a char boundary.
                if cmdline.is_char_boundary(start) {
                    let tail: String = cmdline[start..].chars().take(80).collect();
                    return Some(format!("Command Prompt — Running: {}", tail));
                }
            }
        }
    }

    // --- PowerShell ---
    if name_lower == "powershell.exe" || name_lower == "pwsh.exe" {
        let ps_name = if name_lower == "powershell.exe" { "PowerShell" } else { "PowerShell 7" };
        if cmd_lower.contains("-encodedcommand") {
            return Some(format!("{} — Running an encoded command", ps_name));
        }
        if let Some(caps) = RE_PS_FILE.captures(cmdline) {
            return Some(format!("{} — Running script: {}", ps_name, basename(&caps[1])));
        }
        if cmd_lower.contains("-command ") || cmd_lower.contains("-c ") {
            return Some(format!("{} — Running a command", ps_name));
        }
    }

    // --- svchost.exe with explicit -s flag ---
    if name_lower == "svchost.exe" {
        if let Some(caps) = RE_SVCHOST_SERVICE.captures(cmdline) {
            return Some(format!("Service Host: {}", facts::service_description(&caps[1])));
        }
    }

    // --- rundll32.exe ---
    if name_lower == "rundll32.exe" {
        if let Some(args) = cmdline.split_once(char::is_whitespace).map(|(_, rest)| rest) {
            if let Some(caps) = RE_DLL_NAME.captures(args) {
                let head: String = args.chars().take(60).collect();
                return Some(format!("Running DLL function: {} — {}", &caps[1], head));
            }
        }
    }

    // --- msiexec.exe ---
    if name_lower == "msiexec.exe" {
        if cmd_lower.contains("/i ") {
            return Some("Windows Installer — Installing software".to_string());
        }
        if cmd_lower.contains("/x ") {
            return Some("Windows Installer — Uninstalling software".to_string());
        }
        if cmd_lower.contains("/p ") {
            return Some("Windows Installer — Applying patch".to_string());
        }
    }

    None
}

/// Mô tả helper process theo app cha
fn describe_helper(name_lower: &str, parent_app: &str) -> Option<String> {
    let text = match name_lower {
        "conhost.exe" => format!("Console window for {} — draws the text output", parent_app),
        "crashpad_handler.exe" => {
            format!("Crash reporter for {} — sends crash data if it crashes", parent_app)
        }
        "msedgewebview2.exe" => {
            format!("Embedded web browser used by {} to display web content", parent_app)
        }
        "runtimebroker.exe" => {
            "Permission broker — manages security permissions for Store apps".to_string()
        }
        "dllhost.exe" => format!("COM Surrogate — hosting a component, launched by {}", parent_app),
        "backgroundtaskhost.exe" => format!("Background task running for {}", parent_app),
        "werfault.exe" => format!("Windows Error Reporting — {} may have crashed", parent_app),
        "werfaultsecure.exe" => {
            format!("Secure error reporter — collecting crash data for {}", parent_app)
        }
        _ => return None,
    };
    Some(text)
}

// ============================================================================
// HELPERS
// ============================================================================

fn basename(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

fn has_risky_token(cmdline: &str) -> bool {
    if cmdline.is_empty() {
        return false;
    }
    let cmd_lower = cmdline.to_lowercase();
    RISKY_CMDLINE_TOKENS.iter().any(|token| cmd_lower.contains(token))
}

fn publisher_conflicts(record: &ProcessRecord, fact_publisher: &str) -> bool {
    if fact_publisher.is_empty() {
        return false;
    }
    match record.signature.publisher() {
        // Only a *different* verified signer is a conflict; unsigned or
        // unknown just means the signal is absent.
        Some(signer) => {
            !signer.to_lowercase().contains(&fact_publisher.to_lowercase())
                && !fact_publisher.to_lowercase().contains(&signer.to_lowercase())
        }
        None => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::process_intel::providers::NullMetadataReader;
    use crate::logic::process_intel::types::SignatureStatus;

    fn snapshot_of(records: Vec<ProcessRecord>) -> ProcessSnapshot {
        ProcessSnapshot::from_records(records)
    }

    fn rec(pid: u32, ppid: Option<u32>, name: &str, cmdline: &str) -> ProcessRecord {
        let mut r = ProcessRecord::new(pid, name);
        r.parent_pid = ppid;
        r.cmdline = cmdline.to_string();
        r
    }

    #[test]
    fn test_fact_base_exact() {
        let record = rec(100, None, "notepad.exe", "notepad.exe");
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.confidence, Confidence::Exact);
        assert_eq!(desc.text, "Notepad");
    }

    #[test]
    fn test_chromium_renderer_role() {
        let record = rec(
            100,
            None,
            "chrome.exe",
            r#"chrome.exe --type=renderer --lang=en-US"#,
        );
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.confidence, Confidence::Inferred);
        assert!(desc.text.contains("Tab renderer"), "got: {}", desc.text);
    }

    #[test]
    fn test_chrome_main_process() {
        let record = rec(100, None, "chrome.exe", "chrome.exe --restore-session");
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert!(desc.text.contains("Main browser process"));
    }

    #[test]
    fn test_svchost_service_flag() {
        let record = rec(900, None, "svchost.exe", "svchost.exe -k netsvcs -p -s Schedule");
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.text, "Service Host: Task Scheduler");
        assert_eq!(desc.confidence, Confidence::Inferred);
    }

    #[test]
    fn test_svchost_hosted_services() {
        let mut record = rec(900, None, "svchost.exe", "");
        record.hosted_services = vec!["Dnscache".to_string(), "XyzSvc".to_string()];
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert!(desc.text.starts_with("Service Host: DNS Client"));
        assert!(desc.text.contains("Windows Service: XyzSvc"));
    }

    #[test]
    fn test_python_script() {
        let record = rec(300, None, "python.exe", r#"python.exe C:\jobs\nightly_sync.py --all"#);
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.text, "Python — Running script: nightly_sync.py");
    }

    #[test]
    fn test_helper_described_by_parent() {
        let parent = rec(50, None, "code.exe", "");
        let child = rec(51, Some(50), "conhost.exe", "");
        let snapshot = snapshot_of(vec![parent, child.clone()]);
        let desc = resolve(&child, &snapshot, &NullMetadataReader);
        assert!(desc.text.contains("Console window for VS Code"), "got: {}", desc.text);
        assert_eq!(desc.confidence, Confidence::Inferred);
    }

    #[test]
    fn test_unknown_fallback() {
        let record = rec(400, None, "zzqx.exe", "");
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.confidence, Confidence::Unknown);
        assert!(desc.text.contains("unknown purpose"));
    }

    #[test]
    fn test_risky_token_lowers_confidence() {
        // Fact base knows notepad.exe, but the command line carries a token
        // notepad has no business running with.
        let record = rec(
            500,
            None,
            "notepad.exe",
            "notepad.exe -EncodedCommand SQBFAFgA",
        );
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.confidence, Confidence::Inferred);
    }

    #[test]
    fn test_publisher_conflict_lowers_confidence() {
        let mut record = rec(600, None, "chrome.exe", "");
        record.signature =
            SignatureStatus::SignedTrusted { publisher: "Totally Real Software".to_string() };
        let snapshot = snapshot_of(vec![record.clone()]);
        let desc = resolve(&record, &snapshot, &NullMetadataReader);
        assert_eq!(desc.confidence, Confidence::Inferred);
    }
}
