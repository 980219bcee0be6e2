//! Error types shared by the cleanup and tool-wrapper modules.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::inuse::InUseReason;

/// Failures that abort a cleanup before any planning happens.
#[derive(Error, Debug)]
pub enum CleanError {
    /// The root directory of a cleanup target does not exist.
    #[error("{} not found", .0.display())]
    PathNotFound(PathBuf),

    /// The in-use heuristic tripped and `--force` was not given.
    #[error("{} appears to be in use ({reason})", .path.display())]
    DirectoryInUse {
        /// Root that was checked.
        path: PathBuf,
        /// What the heuristic found.
        reason: InUseReason,
    },

    /// The root exists but could not be listed.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Root that failed to list.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CleanError {
    /// Wrap a listing error, mapping `NotFound` onto [`CleanError::PathNotFound`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::PathNotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

/// A single entry that could not be removed. Collected, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryError {
    /// Entry that survived.
    pub path: PathBuf,
    /// Rendered cause of the failure.
    pub cause: String,
}

impl EntryError {
    /// Build an error from any displayable cause.
    pub fn new(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.cause)
    }
}

/// Failures invoking an external command-line tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The binary does not resolve on `PATH`.
    #[error("'{0}' is not installed or not on PATH")]
    NotInstalled(String),

    /// The binary exists but could not be started.
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        /// Tool name as invoked.
        tool: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The child was killed after running past its deadline.
    #[error("{tool} did not finish within {secs}s")]
    Timeout {
        /// Tool name as invoked.
        tool: String,
        /// Deadline in whole seconds.
        secs: u64,
    },

    /// The tool exited non-zero.
    #[error("{tool} exited with status {code}: {stderr}")]
    Failed {
        /// Tool name as invoked.
        tool: String,
        /// Exit code, or -1 when killed by a signal.
        code: i32,
        /// Trimmed stderr.
        stderr: String,
    },

    /// The tool is installed but its service is not usable (e.g. no Docker daemon).
    #[error("{tool} is unavailable: {reason}")]
    Unavailable {
        /// Tool name as invoked.
        tool: String,
        /// Human-readable explanation.
        reason: String,
    },
}

/// Invalid input to the port tools.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// Outside `1..=65535`, or `start > end`.
    #[error(
        "invalid port range {start}-{end}: ports must be between 1 and 65535 and start must not exceed end"
    )]
    InvalidRange {
        /// First port requested.
        start: u32,
        /// Last port requested.
        end: u32,
    },

    /// Neither a known signal name nor a number.
    #[error("unknown signal '{0}'")]
    UnknownSignal(String),
}

/// Failures loading the optional TOML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`Config`](crate::Config).
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// TOML decoding error.
        #[source]
        source: toml::de::Error,
    },
}
