//! Heuristic "is Xcode using this directory?" check.
//!
//! Two signals are consulted: marker files left behind by Xcode and its
//! build tools, and open file handles reported by `lsof +D`. Neither is
//! authoritative; a missing `lsof` or one that times out counts as "not
//! detected".

use crate::process;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Marker substrings used when the config does not override them.
pub const DEFAULT_LOCK_MARKERS: &[&str] = &[
    "com.apple.dt.Xcode",
    "com.apple.dt.xcodebuild",
    "com.apple.DeveloperTools",
];

const LSOF_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a directory was judged to be in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InUseReason {
    /// A file whose name contains a lock marker exists in the tree.
    LockMarker(PathBuf),
    /// `lsof` reported open handles; holds the distinct command names.
    OpenHandles(Vec<String>),
    /// The tree could not be walked at all.
    Unreadable,
}

impl fmt::Display for InUseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockMarker(path) => write!(f, "lock marker {}", path.display()),
            Self::OpenHandles(commands) if commands.is_empty() => {
                write!(f, "files are held open")
            }
            Self::OpenHandles(commands) => {
                write!(f, "files are held open by {}", commands.join(", "))
            }
            Self::Unreadable => write!(f, "directory is not readable"),
        }
    }
}

/// Run both heuristics against `path`. `None` means nothing was detected.
pub fn check_in_use<S: AsRef<str>>(path: &Path, markers: &[S]) -> Option<InUseReason> {
    if let Some(reason) = find_lock_marker(path, markers) {
        return Some(reason);
    }
    open_handles(path)
}

/// Walk `path` looking for a file whose name contains one of `markers`.
pub fn find_lock_marker<S: AsRef<str>>(path: &Path, markers: &[S]) -> Option<InUseReason> {
    if markers.is_empty() {
        return None;
    }

    let mut walker = WalkDir::new(path).into_iter();
    // The root itself failing to open means we cannot vouch for the tree.
    match walker.next() {
        Some(Ok(_)) => {}
        Some(Err(_)) | None => return Some(InUseReason::Unreadable),
    }

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if markers.iter().any(|m| name.contains(m.as_ref())) {
            tracing::debug!(path = %entry.path().display(), "lock marker found");
            return Some(InUseReason::LockMarker(entry.into_path()));
        }
    }
    None
}

fn open_handles(path: &Path) -> Option<InUseReason> {
    let dir = path.to_string_lossy();
    match process::run_with_timeout("lsof", ["+D", dir.as_ref()], LSOF_TIMEOUT) {
        Ok(out) => {
            let commands = parse_lsof_commands(&out.stdout);
            if commands.is_empty() {
                None
            } else {
                Some(InUseReason::OpenHandles(commands))
            }
        }
        Err(e) => {
            tracing::debug!("open-handle check skipped: {e}");
            None
        }
    }
}

/// Distinct command names from `lsof` output, header skipped, in first-seen order.
pub fn parse_lsof_commands(output: &str) -> Vec<String> {
    let mut commands: Vec<String> = Vec::new();
    for line in output.lines().skip(1) {
        if let Some(cmd) = line.split_whitespace().next() {
            if !commands.iter().any(|c| c == cmd) {
                commands.push(cmd.to_string());
            }
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_marker_file_is_detected() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("Build/Intermediates");
        fs::create_dir_all(&nested).unwrap();
        let marker = nested.join("com.apple.dt.xcodebuild.lock");
        fs::write(&marker, "").unwrap();

        let reason = find_lock_marker(tmp.path(), DEFAULT_LOCK_MARKERS).unwrap();
        assert_eq!(reason, InUseReason::LockMarker(marker));
    }

    #[test]
    fn test_clean_tree_has_no_marker() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("info.plist"), "").unwrap();
        assert!(find_lock_marker(tmp.path(), DEFAULT_LOCK_MARKERS).is_none());
    }

    #[test]
    fn test_missing_root_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let reason = find_lock_marker(&tmp.path().join("gone"), DEFAULT_LOCK_MARKERS);
        assert_eq!(reason, Some(InUseReason::Unreadable));
    }

    #[test]
    fn test_empty_marker_list_disables_check() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("com.apple.dt.Xcode"), "").unwrap();
        let none: [&str; 0] = [];
        assert!(find_lock_marker(tmp.path(), &none).is_none());
    }

    #[test]
    fn test_parse_lsof_commands_dedups() {
        let out = "\
COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
Xcode    4242 dev   cwd    DIR    1,4      640  123 /Users/dev/DerivedData
Xcode    4242 dev   txt    REG    1,4     1024  124 /Users/dev/DerivedData/a
SourceKit 77 dev    3r     REG    1,4       10  125 /Users/dev/DerivedData/b
";
        assert_eq!(parse_lsof_commands(out), vec!["Xcode", "SourceKit"]);
        assert!(parse_lsof_commands("").is_empty());
    }

    #[test]
    fn test_reason_display() {
        let reason = InUseReason::OpenHandles(vec!["Xcode".into(), "lldb".into()]);
        assert_eq!(reason.to_string(), "files are held open by Xcode, lldb");
        assert_eq!(InUseReason::Unreadable.to_string(), "directory is not readable");
    }
}
