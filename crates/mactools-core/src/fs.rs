//! Filesystem primitives used by the reaper.
//!
//! The [`FileSystem`] trait is the only boundary the reaper crosses, which
//! keeps the planning logic testable with an in-memory fake. [`LocalFs`] is
//! the real implementation backed by `std::fs` and `walkdir`.

use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Operations the reaper needs from the filesystem.
pub trait FileSystem {
    /// Immediate children of `dir`, sorted by path.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` if `dir` does not exist, or any other listing error.
    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Total size in bytes of everything under `path`. Best effort:
    /// unreadable entries are skipped rather than failing the walk.
    fn dir_size(&self, path: &Path) -> u64;

    /// Remove `path` and everything below it.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error (permission denied, vanished path, ...).
    fn delete_recursive(&self, path: &Path) -> io::Result<()>;

    /// Last modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if metadata cannot be read.
    fn mod_time(&self, path: &Path) -> io::Result<SystemTime>;

    /// Whether `path` is a directory (symlinks are not followed).
    fn is_dir(&self, path: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut children = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .collect::<Vec<_>>();
        children.sort();
        Ok(children)
    }

    fn dir_size(&self, path: &Path) -> u64 {
        WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    fn delete_recursive(&self, path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn mod_time(&self, path: &Path) -> io::Result<SystemTime> {
        fs::symlink_metadata(path)?.modified()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
    }
}

/// A set of glob patterns that protect paths from cleanup.
///
/// A path is excluded when a pattern matches either its file name or its
/// path relative to the walk root, so `.X*` protects `/tmp/.X11-unix` and
/// `**/C/*` protects anything directly inside a `C` directory.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    /// Compile the given patterns, skipping (and logging) invalid ones.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p.as_ref()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!(pattern = p.as_ref(), "ignoring invalid exclude pattern: {e}");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// No valid patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path` (found under `root`) is protected.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let name = path.file_name().map(|n| n.to_string_lossy());
        self.patterns.iter().any(|p| {
            p.matches_path(rel) || name.as_deref().is_some_and(|n| p.matches(n))
        })
    }
}

/// Regular files under `root` that are not protected by `excludes`.
/// Excluded directories are pruned entirely.
pub fn files_excluding(root: &Path, excludes: &ExcludeSet) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !excludes.matches(root, e.path()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, bytes: usize) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, vec![b'x'; bytes]).unwrap();
    }

    #[test]
    fn test_dir_size_sums_nested_files() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("a.bin"), 100);
        write(&tmp.path().join("sub/b.bin"), 50);
        write(&tmp.path().join("sub/deeper/c.bin"), 25);

        assert_eq!(LocalFs.dir_size(tmp.path()), 175);
    }

    #[test]
    fn test_dir_size_of_file_and_missing_path() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("only.bin");
        write(&file, 42);

        assert_eq!(LocalFs.dir_size(&file), 42);
        assert_eq!(LocalFs.dir_size(&tmp.path().join("missing")), 0);
    }

    #[test]
    fn test_list_children_sorted_and_not_found() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("b"), 1);
        write(&tmp.path().join("a"), 1);

        let children = LocalFs.list_children(tmp.path()).unwrap();
        assert_eq!(children, vec![tmp.path().join("a"), tmp.path().join("b")]);

        let err = LocalFs.list_children(&tmp.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_recursive_handles_files_and_dirs() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f.txt");
        let dir = tmp.path().join("d");
        write(&file, 3);
        write(&dir.join("inner/g.txt"), 3);

        LocalFs.delete_recursive(&file).unwrap();
        LocalFs.delete_recursive(&dir).unwrap();
        assert!(!file.exists());
        assert!(!dir.exists());

        assert!(LocalFs.delete_recursive(&dir).is_err());
    }

    #[test]
    fn test_exclude_set_matches_name_and_relative_path() {
        let excludes = ExcludeSet::new(&[".X*", "com.apple.*", "**/C/*"]);
        let root = Path::new("/tmp");

        assert!(excludes.matches(root, Path::new("/tmp/.X11-unix")));
        assert!(excludes.matches(root, Path::new("/tmp/com.apple.launchd.abc")));
        assert!(excludes.matches(root, Path::new("/tmp/zz/C/cache")));
        assert!(!excludes.matches(root, Path::new("/tmp/build.log")));
    }

    #[test]
    fn test_files_excluding_prunes_protected_trees() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("keep.lock1"), 10);
        write(&tmp.path().join("junk.txt"), 20);
        write(&tmp.path().join("com.apple.sock/inner.txt"), 30);
        write(&tmp.path().join("nested/old.log"), 40);

        let excludes = ExcludeSet::new(&[".lock*", "*.lock1", "com.apple.*"]);
        let mut files = files_excluding(tmp.path(), &excludes);
        files.sort();

        assert_eq!(
            files,
            vec![tmp.path().join("junk.txt"), tmp.path().join("nested/old.log")]
        );
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let excludes = ExcludeSet::new(&["[unclosed"]);
        assert!(excludes.is_empty());
    }
}
