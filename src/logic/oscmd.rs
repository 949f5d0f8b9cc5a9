//! Bounded OS Command Runner
//!
//! Mọi lệnh OS (sc / reg / schtasks / taskkill) đều phải có deadline:
//! a hung service control manager must surface as a failure, not hang the
//! engine. No automatic retries here or anywhere above.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Poll interval while waiting for a child to exit
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug)]
pub enum CommandError {
    Spawn(std::io::Error),
    TimedOut { program: String, after: Duration },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Spawn(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::TimedOut { program, after } => {
                write!(f, "Command '{}' timed out after {:?}", program, after)
            }
        }
    }
}

impl std::error::Error for CommandError {}

// ============================================================================
// RUNNER
// ============================================================================

/// Run a command, killing it if it exceeds `timeout`.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(CommandError::Spawn)?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout) {
        Some(status) => status,
        None => {
            // Deadline hit: kill and reap so the child doesn't linger
            let _ = child.kill();
            let _ = child.wait();
            drain(stdout_reader);
            drain(stderr_reader);
            log::warn!("Command '{}' exceeded {:?}, killed", program, timeout);
            return Err(CommandError::TimedOut { program: program.to_string(), after: timeout });
        }
    };

    Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        stdout: drain(stdout_reader),
        stderr: drain(stderr_reader),
    })
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(_) => return None,
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<String>> {
    source.map(|mut reader| {
        thread::spawn(move || {
            let mut buffer = String::new();
            let _ = reader.read_to_string(&mut buffer);
            buffer
        })
    })
}

fn drain(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_captures_output() {
        let out = run_with_timeout("echo", &["hello"], Duration::from_secs(5)).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_hung_command() {
        let start = Instant::now();
        let result = run_with_timeout("sleep", &["30"], Duration::from_millis(200));
        assert!(matches!(result, Err(CommandError::TimedOut { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let result = run_with_timeout("definitely-not-a-real-binary-xq", &[], Duration::from_secs(1));
        assert!(matches!(result, Err(CommandError::Spawn(_))));
    }
}
