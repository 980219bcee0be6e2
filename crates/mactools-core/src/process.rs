//! Thin wrapper around `std::process::Command` for the wrapped macOS tools.
//!
//! Parsers never call this module; commands capture output here and hand
//! the text to the per-tool parser modules.

use crate::error::ToolError;
use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, or -1 when terminated by a signal.
    pub code: i32,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

impl ToolOutput {
    /// Exit code zero.
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Convert a non-zero exit into [`ToolError::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Failed`] carrying stderr when the exit code is non-zero.
    pub fn check(self, tool: &str) -> Result<Self, ToolError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                tool: tool.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Whether `tool` resolves on `PATH`.
pub fn is_installed(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Run `tool` with `args` to completion and capture its output.
///
/// # Errors
///
/// [`ToolError::NotInstalled`] when the binary is missing, [`ToolError::Spawn`]
/// for any other spawn failure. A non-zero exit is *not* an error here; use
/// [`ToolOutput::check`] when it should be.
pub fn run<I, S>(tool: &str, args: I) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool, "spawning");
    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(tool, e))?;

    Ok(ToolOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like [`run`], but kill the child if it has not exited within `timeout`.
///
/// Both pipes are drained on background threads while waiting, so a child
/// producing more output than the pipe buffer holds still finishes.
///
/// # Errors
///
/// As [`run`], plus [`ToolError::Timeout`] when the deadline passes.
pub fn run_with_timeout<I, S>(
    tool: &str,
    args: I,
    timeout: Duration,
) -> Result<ToolOutput, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool, ?timeout, "spawning with timeout");
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        // Readers are left detached: a surviving grandchild may hold the pipes open.
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolError::Timeout {
                tool: tool.to_string(),
                secs: timeout.as_secs(),
            });
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_error(tool, e));
        }
    };

    Ok(ToolOutput {
        code: status.code().unwrap_or(-1),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Run `tool` with stdio inherited so the user sees its output live.
/// Returns the exit code.
///
/// # Errors
///
/// [`ToolError::NotInstalled`] or [`ToolError::Spawn`].
pub fn run_inherited<I, S>(tool: &str, args: I) -> Result<i32, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool, "spawning (inherited stdio)");
    let status = Command::new(tool)
        .args(args)
        .status()
        .map_err(|e| spawn_error(tool, e))?;
    Ok(status.code().unwrap_or(-1))
}

fn spawn_error(tool: &str, e: std::io::Error) -> ToolError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotInstalled(tool.to_string())
    } else {
        ToolError::Spawn {
            tool: tool.to_string(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_not_installed() {
        let err = run("definitely-not-a-real-tool-xyz", ["--help"]).unwrap_err();
        assert!(matches!(err, ToolError::NotInstalled(t) if t == "definitely-not-a-real-tool-xyz"));
        assert!(!is_installed("definitely-not-a-real-tool-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_stdout_and_exit_code() {
        let out = run("sh", ["-c", "echo hello; exit 3"]).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.code, 3);
        assert!(out.check("sh").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_child() {
        let err = run_with_timeout("sh", ["-c", "sleep 5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_drains_output_larger_than_pipe_buffer() {
        let out = run_with_timeout(
            "sh",
            ["-c", "head -c 200000 /dev/zero | tr '\\0' 'x'"],
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.len(), 200_000);
        assert!(out.stdout.bytes().all(|b| b == b'x'));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_returns_output() {
        let out = run_with_timeout("sh", ["-c", "echo done"], Duration::from_secs(5)).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "done");
    }
}
