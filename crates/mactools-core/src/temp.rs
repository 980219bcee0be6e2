//! Temporary-file cleanup targets.
//!
//! User cache and log folders are emptied wholesale. The shared system temp
//! folders are only thinned: individual files are removed, directories are
//! left in place, and anything matching a protection pattern is skipped.

use crate::error::CleanError;
use crate::fs::{ExcludeSet, FileSystem, files_excluding};
use crate::paths;
use crate::reaper::{Entry, recency_of};
use std::path::{Path, PathBuf};

/// A location `system cleanup-temp` can clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TempTarget {
    /// `~/Library/Caches`
    Caches,
    /// `~/Library/Logs`
    Logs,
    /// `~/Library/Application Support/Caches`
    AppCaches,
    /// `/tmp`
    Tmp,
    /// `/private/var/folders`
    VarFolders,
}

impl TempTarget {
    /// Every target, in display order.
    pub const ALL: [Self; 5] = [
        Self::Caches,
        Self::Logs,
        Self::AppCaches,
        Self::Tmp,
        Self::VarFolders,
    ];

    /// Stable identifier used in JSON output.
    pub fn key(self) -> &'static str {
        match self {
            Self::Caches => "caches",
            Self::Logs => "logs",
            Self::AppCaches => "app_caches",
            Self::Tmp => "tmp",
            Self::VarFolders => "var_folders",
        }
    }

    /// Human label for text output.
    pub fn description(self) -> &'static str {
        match self {
            Self::Caches => "User caches",
            Self::Logs => "Log files",
            Self::AppCaches => "Application support caches",
            Self::Tmp => "Temporary files",
            Self::VarFolders => "System temp files",
        }
    }

    /// Root directory of the target.
    pub fn path(self) -> PathBuf {
        match self {
            Self::Caches => paths::user_caches(),
            Self::Logs => paths::user_logs(),
            Self::AppCaches => paths::app_caches(),
            Self::Tmp => PathBuf::from("/tmp"),
            Self::VarFolders => PathBuf::from("/private/var/folders"),
        }
    }

    /// Glob patterns that are never touched.
    pub fn protected(self) -> &'static [&'static str] {
        match self {
            Self::Tmp => &[".X*", ".lock*", "com.apple.*"],
            Self::VarFolders => &["**/C/*", "**/T/com.apple*"],
            Self::Caches | Self::Logs | Self::AppCaches => &[],
        }
    }

    /// Whether whole children of the root are removed (as opposed to single files).
    pub fn removes_children(self) -> bool {
        matches!(self, Self::Caches | Self::Logs | Self::AppCaches)
    }
}

/// Entries that cleaning `target` rooted at `root` would remove.
///
/// # Errors
///
/// [`CleanError::PathNotFound`] when `root` is absent.
pub fn discover<F: FileSystem + ?Sized>(
    fs: &F,
    target: TempTarget,
    root: &Path,
) -> Result<Vec<Entry>, CleanError> {
    if !fs.is_dir(root) {
        return Err(CleanError::PathNotFound(root.to_path_buf()));
    }

    let paths = if target.removes_children() {
        fs.list_children(root)
            .map_err(|e| CleanError::from_io(root, e))?
    } else {
        let excludes = ExcludeSet::new(target.protected());
        let mut files = files_excluding(root, &excludes);
        files.sort();
        files
    };

    let entries: Vec<Entry> = paths
        .into_iter()
        .map(|p| {
            let recency = recency_of(fs, &p, None);
            Entry::new(p, target.key(), recency)
        })
        .collect();

    tracing::debug!(target = target.key(), count = entries.len(), "temp entries discovered");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use crate::reaper::{Policy, execute, partition};
    use crate::reporter::NullReporter;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, bytes: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[test]
    fn test_cache_target_removes_children_keeps_root() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("com.example.app/blob"), 100);
        write(&tmp.path().join("loose.db"), 50);

        let entries = discover(&LocalFs, TempTarget::Caches, tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);

        let decision = partition(entries, Policy::RemoveAll, &LocalFs);
        assert_eq!(decision.bytes_to_free, 150);

        let report = execute(&decision.to_remove, &LocalFs, &NullReporter);
        assert_eq!(report.removed_count, 2);
        assert!(tmp.path().exists());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_tmp_target_skips_protected_and_keeps_dirs() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join(".X11-unix/X0"), 1);
        write(&tmp.path().join(".lock-abc"), 1);
        write(&tmp.path().join("com.apple.launchd.xyz/Listeners"), 1);
        write(&tmp.path().join("build/out.o"), 10);
        write(&tmp.path().join("scratch.txt"), 5);

        let entries = discover(&LocalFs, TempTarget::Tmp, tmp.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("build/out.o"), PathBuf::from("scratch.txt")]);

        let decision = partition(entries, Policy::RemoveAll, &LocalFs);
        execute(&decision.to_remove, &LocalFs, &NullReporter);
        assert!(tmp.path().join("build").is_dir());
        assert!(tmp.path().join(".X11-unix/X0").exists());
    }

    #[test]
    fn test_var_folders_protects_cache_dirs() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("zz/abc/C/com.apple.metal/shader"), 1);
        write(&tmp.path().join("zz/abc/T/com.apple.sock"), 1);
        write(&tmp.path().join("zz/abc/T/stale.tmp"), 3);

        let entries = discover(&LocalFs, TempTarget::VarFolders, tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.ends_with("zz/abc/T/stale.tmp"));
    }

    #[test]
    fn test_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&LocalFs, TempTarget::Logs, &tmp.path().join("Logs")).unwrap_err();
        assert!(matches!(err, CleanError::PathNotFound(_)));
    }
}
