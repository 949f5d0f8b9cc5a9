//! Mechanism Backends - Primitive snapshot / apply / restore cho từng cơ chế
//!
//! Một seam duy nhất cho cả bốn cơ chế: capture trạng thái trước, apply
//! mutation disable, restore từ snapshot. Manager giữ mọi invariant
//! (idempotence, at-most-one-Active); backend chỉ biết OS primitives.
//! Injectable để test engine không cần OS thật.

use super::types::{CapturedState, SuppressTarget, SuppressionError};

// ============================================================================
// BACKEND TRAIT
// ============================================================================

pub trait MechanismBackend: Send + Sync {
    /// Capture the current state of the target, sufficient for exact restore.
    fn capture(&self, target: &SuppressTarget) -> Result<CapturedState, SuppressionError>;

    /// Apply the disabling mutation.
    fn disable(&self, target: &SuppressTarget) -> Result<(), SuppressionError>;

    /// Apply the inverse mutation using the captured snapshot.
    fn restore(
        &self,
        target: &SuppressTarget,
        state: &CapturedState,
    ) -> Result<(), SuppressionError>;
}

// ============================================================================
// OS BACKEND (Windows service controller / registry / task scheduler)
// ============================================================================

#[cfg(windows)]
pub use windows_impl::OsBackend;

#[cfg(not(windows))]
pub struct OsBackend;

#[cfg(not(windows))]
impl MechanismBackend for OsBackend {
    fn capture(&self, target: &SuppressTarget) -> Result<CapturedState, SuppressionError> {
        Err(SuppressionError::Backend(format!(
            "{} suppression is not supported on this platform",
            target.mechanism().as_str()
        )))
    }

    fn disable(&self, target: &SuppressTarget) -> Result<(), SuppressionError> {
        Err(SuppressionError::Backend(format!(
            "{} suppression is not supported on this platform",
            target.mechanism().as_str()
        )))
    }

    fn restore(
        &self,
        target: &SuppressTarget,
        _state: &CapturedState,
    ) -> Result<(), SuppressionError> {
        Err(SuppressionError::Backend(format!(
            "{} suppression is not supported on this platform",
            target.mechanism().as_str()
        )))
    }
}

#[cfg(windows)]
mod windows_impl {
    use std::time::Duration;

    use crate::constants::OS_COMMAND_TIMEOUT_SECS;
    use crate::logic::oscmd::{run_with_timeout, CommandError, CommandOutput};
    use crate::logic::suppression::types::{
        CapturedState, RegistryHive, ServiceStartMode, SuppressTarget, SuppressionError,
    };

    use super::MechanismBackend;

    /// Run-key path under either hive
    const RUN_KEY_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

    /// Companion key mirroring disabled entries, so other tools see the item
    /// as disabled instead of silently vanished
    const RUN_DISABLED_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run-Disabled";

    /// IFEO root; a Debugger value under <exe> redirects every launch
    const IFEO_PATH: &str =
        r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Image File Execution Options";

    /// Redirect target for IFEO blocks. Points at a harmless stub, so the
    /// blocked executable never actually starts.
    const IFEO_BLOCKER: &str = r"C:\Windows\System32\systray.exe";

    pub struct OsBackend;

    impl OsBackend {
        fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SuppressionError> {
            match run_with_timeout(program, args, Duration::from_secs(OS_COMMAND_TIMEOUT_SECS)) {
                Ok(output) => Ok(output),
                Err(CommandError::TimedOut { program, after }) => Err(SuppressionError::Timeout(
                    format!("'{}' did not finish within {:?}", program, after),
                )),
                Err(e) => Err(SuppressionError::Backend(e.to_string())),
            }
        }

        /// Run and require success, mapping failures into the taxonomy
        fn run_checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput, SuppressionError> {
            let output = self.run(program, args)?;
            if output.success {
                Ok(output)
            } else {
                Err(map_failure(&output))
            }
        }
    }

    impl MechanismBackend for OsBackend {
        fn capture(&self, target: &SuppressTarget) -> Result<CapturedState, SuppressionError> {
            match target {
                SuppressTarget::Service { name } => {
                    let output = self.run_checked("sc", &["qc", name])?;
                    let mode = parse_start_mode(&output.stdout).ok_or_else(|| {
                        SuppressionError::Backend(format!(
                            "could not parse start mode for service '{}'",
                            name
                        ))
                    })?;
                    Ok(CapturedState::ServiceStartMode { mode })
                }
                SuppressTarget::RunKey { hive, value_name } => {
                    let prior = self.query_reg_value(&run_key(*hive), value_name)?;
                    Ok(CapturedState::RunKeyValue { prior })
                }
                SuppressTarget::ScheduledTask { path } => {
                    let output = self.run_checked("schtasks", &["/Query", "/TN", path, "/FO", "LIST"])?;
                    let enabled = !output
                        .stdout
                        .lines()
                        .any(|line| line.contains("Status:") && line.contains("Disabled"));
                    Ok(CapturedState::TaskEnabled { enabled })
                }
                SuppressTarget::Ifeo { exe_name } => {
                    let prior = self.query_reg_value(&ifeo_key(exe_name), "Debugger")?;
                    Ok(CapturedState::IfeoDebugger { prior })
                }
            }
        }

        fn disable(&self, target: &SuppressTarget) -> Result<(), SuppressionError> {
            match target {
                SuppressTarget::Service { name } => {
                    self.run_checked("sc", &["config", name, "start=", "disabled"])?;
                    // Best effort: stop the running instance too. The service
                    // may simply not be running.
                    if let Ok(output) = self.run("sc", &["stop", name]) {
                        if !output.success {
                            log::debug!("sc stop {}: {}", name, output.stderr.trim());
                        }
                    }
                    Ok(())
                }
                SuppressTarget::RunKey { hive, value_name } => {
                    let key = run_key(*hive);
                    match self.query_reg_value(&key, value_name)? {
                        Some(value) => {
                            // Mirror first, so a crash between the two steps
                            // leaves the command recoverable from the mirror.
                            self.run_checked(
                                "reg",
                                &[
                                    "add",
                                    &disabled_run_key(*hive),
                                    "/v",
                                    value_name,
                                    "/t",
                                    "REG_SZ",
                                    "/d",
                                    &value,
                                    "/f",
                                ],
                            )?;
                            self.run_checked("reg", &["delete", &key, "/v", value_name, "/f"])?;
                            Ok(())
                        }
                        // Value already absent: the suppressed state holds.
                        None => Ok(()),
                    }
                }
                SuppressTarget::ScheduledTask { path } => {
                    self.run_checked("schtasks", &["/Change", "/TN", path, "/Disable"])?;
                    Ok(())
                }
                SuppressTarget::Ifeo { exe_name } => {
                    self.run_checked(
                        "reg",
                        &[
                            "add",
                            &ifeo_key(exe_name),
                            "/v",
                            "Debugger",
                            "/t",
                            "REG_SZ",
                            "/d",
                            IFEO_BLOCKER,
                            "/f",
                        ],
                    )?;
                    Ok(())
                }
            }
        }

        fn restore(
            &self,
            target: &SuppressTarget,
            state: &CapturedState,
        ) -> Result<(), SuppressionError> {
            match (target, state) {
                (SuppressTarget::Service { name }, CapturedState::ServiceStartMode { mode }) => {
                    self.run_checked("sc", &["config", name, "start=", mode.sc_arg()])?;
                    Ok(())
                }
                (SuppressTarget::RunKey { hive, value_name }, CapturedState::RunKeyValue { prior }) => {
                    match prior {
                        Some(value) => {
                            self.run_checked(
                                "reg",
                                &[
                                    "add",
                                    &run_key(*hive),
                                    "/v",
                                    value_name,
                                    "/t",
                                    "REG_SZ",
                                    "/d",
                                    value,
                                    "/f",
                                ],
                            )?;
                            self.delete_reg_value_if_present(
                                &disabled_run_key(*hive),
                                value_name,
                            )?;
                        }
                        // Previously absent: re-delete, so revert-of-revert
                        // stays a no-op.
                        None => {
                            self.delete_reg_value_if_present(&run_key(*hive), value_name)?;
                        }
                    }
                    Ok(())
                }
                (SuppressTarget::ScheduledTask { path }, CapturedState::TaskEnabled { enabled }) => {
                    let flag = if *enabled { "/Enable" } else { "/Disable" };
                    self.run_checked("schtasks", &["/Change", "/TN", path, flag])?;
                    Ok(())
                }
                (SuppressTarget::Ifeo { exe_name }, CapturedState::IfeoDebugger { prior }) => {
                    match prior {
                        // A debugger entry existed before this suppression;
                        // put the original value back, never delete it.
                        Some(value) => {
                            self.run_checked(
                                "reg",
                                &[
                                    "add",
                                    &ifeo_key(exe_name),
                                    "/v",
                                    "Debugger",
                                    "/t",
                                    "REG_SZ",
                                    "/d",
                                    value,
                                    "/f",
                                ],
                            )?;
                        }
                        None => {
                            self.delete_reg_value_if_present(&ifeo_key(exe_name), "Debugger")?;
                        }
                    }
                    Ok(())
                }
                _ => Err(SuppressionError::Backend(
                    "captured state does not match target mechanism".to_string(),
                )),
            }
        }
    }

    impl OsBackend {
        /// Query a registry value; Ok(None) when the value or key is absent
        fn query_reg_value(
            &self,
            key: &str,
            value_name: &str,
        ) -> Result<Option<String>, SuppressionError> {
            let output = self.run("reg", &["query", key, "/v", value_name])?;
            if output.success {
                Ok(parse_reg_value(&output.stdout, value_name))
            } else if looks_like_missing(&output.stderr) || looks_like_missing(&output.stdout) {
                Ok(None)
            } else {
                Err(map_failure(&output))
            }
        }

        fn delete_reg_value_if_present(
            &self,
            key: &str,
            value_name: &str,
        ) -> Result<(), SuppressionError> {
            let output = self.run("reg", &["delete", key, "/v", value_name, "/f"])?;
            if output.success
                || looks_like_missing(&output.stderr)
                || looks_like_missing(&output.stdout)
            {
                Ok(())
            } else {
                Err(map_failure(&output))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Parsing helpers
    // ------------------------------------------------------------------------

    fn run_key(hive: RegistryHive) -> String {
        format!(r"{}\{}", hive.prefix(), RUN_KEY_PATH)
    }

    fn disabled_run_key(hive: RegistryHive) -> String {
        format!(r"{}\{}", hive.prefix(), RUN_DISABLED_PATH)
    }

    fn ifeo_key(exe_name: &str) -> String {
        format!(r"{}\{}", IFEO_PATH, exe_name)
    }

    /// Parse `sc qc` output: `START_TYPE : 2 AUTO_START`
    fn parse_start_mode(stdout: &str) -> Option<ServiceStartMode> {
        let line = stdout.lines().find(|l| l.contains("START_TYPE"))?;
        if line.contains("2") {
            Some(ServiceStartMode::Auto)
        } else if line.contains("3") {
            Some(ServiceStartMode::Manual)
        } else if line.contains("4") {
            Some(ServiceStartMode::Disabled)
        } else {
            None
        }
    }

    /// Parse `reg query` output: `    <name>    REG_SZ    <data>`
    fn parse_reg_value(stdout: &str, value_name: &str) -> Option<String> {
        for line in stdout.lines() {
            let trimmed = line.trim();
            if !trimmed.to_lowercase().starts_with(&value_name.to_lowercase()) {
                continue;
            }
            for reg_type in ["REG_EXPAND_SZ", "REG_SZ"] {
                if let Some(pos) = trimmed.find(reg_type) {
                    return Some(trimmed[pos + reg_type.len()..].trim().to_string());
                }
            }
        }
        None
    }

    fn looks_like_missing(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("unable to find")
            || lower.contains("not found")
            || lower.contains("does not exist")
            || lower.contains("cannot find")
    }

    /// Map a failed command into the error taxonomy
    fn map_failure(output: &CommandOutput) -> SuppressionError {
        let message = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        let lower = message.to_lowercase();

        if lower.contains("denied") {
            SuppressionError::AccessDenied(message)
        } else if looks_like_missing(&message)
            || lower.contains("1060")
            || lower.contains("does not exist as an installed service")
        {
            SuppressionError::NotFound(message)
        } else {
            SuppressionError::Backend(message)
        }
    }
}
