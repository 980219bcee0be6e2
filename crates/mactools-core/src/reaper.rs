//! Retention-policy directory reaper.
//!
//! Cleanup is two-phase. [`partition`] is a pure planning step that decides
//! which entries survive under a [`Policy`]; [`execute`] then removes the
//! planned entries one at a time, collecting failures instead of stopping.
//! Nothing is retried and nothing is rolled back.

use crate::error::EntryError;
use crate::fs::FileSystem;
use crate::reporter::Reporter;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Which entries of a group survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Every entry is removed.
    RemoveAll,
    /// The most recent entry of each group is kept.
    KeepNewestPerGroup,
}

/// How recent an entry is.
///
/// `SortKey` is used when no timestamp is available and the name carries a
/// sortable date (e.g. an archive's `2024-01-01` folder). Entries of one
/// group normally share a variant; if they do not, any readable timestamp
/// ranks above any `SortKey`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Recency {
    /// Name-derived key, compared lexicographically.
    SortKey(String),
    /// Filesystem modification time.
    Modified(SystemTime),
}

/// One retainable unit on disk.
#[derive(Debug, Clone)]
pub struct Entry {
    /// File or directory removed as a whole.
    pub path: PathBuf,
    /// Entries sharing a key compete under [`Policy::KeepNewestPerGroup`].
    pub group_key: String,
    /// Ordering within the group.
    pub recency: Recency,
    size: OnceCell<u64>,
}

impl Entry {
    /// Create an entry whose size is measured lazily.
    pub fn new(path: impl Into<PathBuf>, group_key: impl Into<String>, recency: Recency) -> Self {
        Self {
            path: path.into(),
            group_key: group_key.into(),
            recency,
            size: OnceCell::new(),
        }
    }

    /// Size in bytes, computed on first use and cached for the rest of the run.
    pub fn size<F: FileSystem + ?Sized>(&self, fs: &F) -> u64 {
        *self.size.get_or_init(|| fs.dir_size(&self.path))
    }
}

/// Outcome of planning: what survives and what goes.
#[derive(Debug, Clone, Default)]
pub struct RetentionDecision {
    /// Survivors, sorted by path.
    pub to_keep: Vec<Entry>,
    /// Entries to delete, sorted by path.
    pub to_remove: Vec<Entry>,
    /// Summed size of `to_remove`.
    pub bytes_to_free: u64,
}

impl RetentionDecision {
    /// Nothing to remove.
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty()
    }
}

/// Outcome of a removal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecuteReport {
    /// Deletions tried.
    pub attempted: usize,
    /// Deletions that succeeded.
    pub removed_count: usize,
    /// Bytes freed by the successful deletions.
    pub removed_bytes: u64,
    /// One per failed deletion, in attempt order.
    pub errors: Vec<EntryError>,
}

impl ExecuteReport {
    /// True when at least one removal was attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.removed_count == 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ExecuteReport) {
        self.attempted += other.attempted;
        self.removed_count += other.removed_count;
        self.removed_bytes += other.removed_bytes;
        self.errors.extend(other.errors);
    }
}

/// Decide which of `entries` to keep and which to remove under `policy`.
///
/// For [`Policy::KeepNewestPerGroup`] the kept entry of each group is the
/// one with the greatest [`Recency`]; ties go to the lexicographically
/// greatest path. Both output lists are sorted by path, so the result does
/// not depend on input order.
pub fn partition<F: FileSystem + ?Sized>(
    entries: Vec<Entry>,
    policy: Policy,
    fs: &F,
) -> RetentionDecision {
    let (mut to_keep, mut to_remove) = match policy {
        Policy::RemoveAll => (Vec::new(), entries),
        Policy::KeepNewestPerGroup => {
            let mut groups: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
            for entry in entries {
                groups.entry(entry.group_key.clone()).or_default().push(entry);
            }

            let mut keep = Vec::with_capacity(groups.len());
            let mut remove = Vec::new();
            for (_, mut members) in groups {
                members.sort_by(|a, b| {
                    b.recency
                        .cmp(&a.recency)
                        .then_with(|| b.path.cmp(&a.path))
                });
                let mut members = members.into_iter();
                if let Some(newest) = members.next() {
                    keep.push(newest);
                }
                remove.extend(members);
            }
            (keep, remove)
        }
    };

    to_keep.sort_by(|a, b| a.path.cmp(&b.path));
    to_remove.sort_by(|a, b| a.path.cmp(&b.path));
    let bytes_to_free = to_remove.iter().map(|e| e.size(fs)).sum();

    tracing::debug!(
        keep = to_keep.len(),
        remove = to_remove.len(),
        bytes_to_free,
        "retention plan"
    );

    RetentionDecision {
        to_keep,
        to_remove,
        bytes_to_free,
    }
}

/// Remove every entry in `to_remove`, isolating failures.
///
/// Each entry is attempted exactly once. The size credited for a removed
/// entry is measured before deletion.
pub fn execute<F, R>(to_remove: &[Entry], fs: &F, reporter: &R) -> ExecuteReport
where
    F: FileSystem + ?Sized,
    R: Reporter + ?Sized,
{
    let mut report = ExecuteReport::default();

    for entry in to_remove {
        report.attempted += 1;
        let size = entry.size(fs);
        reporter.removing(&entry.path);

        match fs.delete_recursive(&entry.path) {
            Ok(()) => {
                report.removed_count += 1;
                report.removed_bytes += size;
                reporter.removed(&entry.path, size);
            }
            Err(e) => {
                tracing::warn!(path = %entry.path.display(), "removal failed: {e}");
                reporter.failed(&entry.path, &e.to_string());
                report.errors.push(EntryError::new(&entry.path, e));
            }
        }
    }

    report
}

/// Convenience for building [`Recency::Modified`] from the filesystem,
/// falling back to `fallback` when the timestamp cannot be read.
///
/// With no fallback an unreadable entry is treated as the oldest possible.
pub fn recency_of<F: FileSystem + ?Sized>(fs: &F, path: &Path, fallback: Option<String>) -> Recency {
    match (fs.mod_time(path), fallback) {
        (Ok(time), _) => Recency::Modified(time),
        (Err(e), Some(key)) => {
            tracing::debug!(path = %path.display(), %key, "mtime unreadable ({e}), using name");
            Recency::SortKey(key)
        }
        (Err(e), None) => {
            tracing::warn!(path = %path.display(), "mtime unreadable ({e}), ranking as oldest");
            Recency::Modified(SystemTime::UNIX_EPOCH)
        }
    }
}
