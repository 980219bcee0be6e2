//! Discovery of Xcode's on-disk artifacts and the rules that group them.
//!
//! Each `discover_*` function turns a directory listing into reaper
//! [`Entry`] values. A missing root is reported as
//! [`CleanError::PathNotFound`] before anything is planned.

use crate::error::CleanError;
use crate::fs::FileSystem;
use crate::reaper::{Entry, recency_of};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

const ARCHIVE_EXT: &str = ".xcarchive";

static VERSION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+\.\d+(\.\d+)?").expect("version prefix regex is valid")
});

/// How an entry name maps to its group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRule {
    /// Text before the first space, `.xcarchive` stripped.
    /// `"MyApp 2024-01-01, 10.00.xcarchive"` groups as `"MyApp"`.
    FirstWord,
    /// Leading `major.minor[.patch]`, falling back to [`GroupRule::FirstWord`].
    /// `"17.2 (21C62) arm64e"` groups as `"17.2"`.
    VersionPrefix,
}

impl GroupRule {
    /// Group key for an entry file name.
    pub fn key(self, name: &str) -> String {
        let stem = name.strip_suffix(ARCHIVE_EXT).unwrap_or(name);
        match self {
            Self::FirstWord => first_word(stem),
            Self::VersionPrefix => VERSION_PREFIX
                .find(stem)
                .map_or_else(|| first_word(stem), |m| m.as_str().to_string()),
        }
    }
}

fn first_word(stem: &str) -> String {
    stem.split(' ').next().unwrap_or(stem).to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_archive(path: &Path) -> bool {
    file_name(path).ends_with(ARCHIVE_EXT)
}

fn list_root<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<std::path::PathBuf>, CleanError> {
    fs.list_children(root)
        .map_err(|e| CleanError::from_io(root, e))
}

/// Archive bundles under `root`.
///
/// Xcode nests archives in date folders (`Archives/2024-01-01/App ....xcarchive`);
/// bundles sitting directly in `root` are accepted too. Recency is the
/// bundle's mtime, or the date folder name when the mtime is unreadable.
///
/// # Errors
///
/// Fails only if `root` itself cannot be listed.
pub fn discover_archives<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<Entry>, CleanError> {
    let mut entries = Vec::new();

    for child in list_root(fs, root)? {
        if is_archive(&child) {
            let key = GroupRule::FirstWord.key(&file_name(&child));
            let recency = recency_of(fs, &child, None);
            entries.push(Entry::new(child, key, recency));
        } else if fs.is_dir(&child) {
            let date_folder = file_name(&child);
            let bundles = match fs.list_children(&child) {
                Ok(bundles) => bundles,
                Err(e) => {
                    tracing::warn!(path = %child.display(), "skipping unreadable folder: {e}");
                    continue;
                }
            };
            for bundle in bundles.into_iter().filter(|b| is_archive(b)) {
                let key = GroupRule::FirstWord.key(&file_name(&bundle));
                let recency = recency_of(fs, &bundle, Some(date_folder.clone()));
                entries.push(Entry::new(bundle, key, recency));
            }
        }
    }

    tracing::debug!(count = entries.len(), root = %root.display(), "archives discovered");
    Ok(entries)
}

/// Per-OS-version device support directories, grouped by version prefix.
///
/// # Errors
///
/// Fails only if `root` itself cannot be listed.
pub fn discover_device_support<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<Entry>, CleanError> {
    let entries: Vec<Entry> = list_root(fs, root)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .map(|p| {
            let key = GroupRule::VersionPrefix.key(&file_name(&p));
            let recency = recency_of(fs, &p, None);
            Entry::new(p, key, recency)
        })
        .collect();

    tracing::debug!(count = entries.len(), root = %root.display(), "device support discovered");
    Ok(entries)
}

/// Every child of `DerivedData` as its own group. `root` itself is never an entry.
///
/// # Errors
///
/// Fails only if `root` itself cannot be listed.
pub fn discover_derived_data<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<Entry>, CleanError> {
    let entries: Vec<Entry> = list_root(fs, root)?
        .into_iter()
        .map(|p| {
            let key = file_name(&p);
            let recency = recency_of(fs, &p, None);
            Entry::new(p, key, recency)
        })
        .collect();

    tracing::debug!(count = entries.len(), "derived data entries discovered");
    Ok(entries)
}

/// Which part of a simulator device an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorArea {
    /// Children of the device's `data` directory.
    Data,
    /// Children of the device's `Library` and `tmp` directories.
    Cache,
}

/// A simulator content entry tagged with its area.
#[derive(Debug, Clone)]
pub struct SimulatorEntry {
    /// Data or cache.
    pub area: SimulatorArea,
    /// The removable unit.
    pub entry: Entry,
}

/// Content of every simulator device under `root` (`CoreSimulator/Devices`).
///
/// The device directories and their `data`/`Library`/`tmp` folders are kept;
/// only what is inside those folders becomes an entry.
///
/// # Errors
///
/// Fails only if `root` itself cannot be listed.
pub fn discover_simulator_content<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<SimulatorEntry>, CleanError> {
    let mut found = Vec::new();

    for device in list_root(fs, root)?.into_iter().filter(|p| fs.is_dir(p)) {
        for (sub, area) in [
            ("data", SimulatorArea::Data),
            ("Library", SimulatorArea::Cache),
            ("tmp", SimulatorArea::Cache),
        ] {
            let dir = device.join(sub);
            if !fs.is_dir(&dir) {
                continue;
            }
            let Ok(children) = fs.list_children(&dir) else {
                tracing::warn!(path = %dir.display(), "skipping unreadable simulator folder");
                continue;
            };
            for child in children {
                let key = file_name(&device);
                let recency = recency_of(fs, &child, None);
                found.push(SimulatorEntry {
                    area,
                    entry: Entry::new(child, key, recency),
                });
            }
        }
    }

    tracing::debug!(count = found.len(), "simulator entries discovered");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use crate::reaper::{Policy, partition};
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use tempfile::TempDir;

    fn mkdir(path: &Path) {
        fs::create_dir_all(path).unwrap();
    }

    fn touch(path: &Path, unix_secs: i64) {
        set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
    }

    #[test]
    fn test_first_word_rule() {
        assert_eq!(GroupRule::FirstWord.key("MyApp 2024-01-01, 10.00.xcarchive"), "MyApp");
        assert_eq!(GroupRule::FirstWord.key("Solo.xcarchive"), "Solo");
        assert_eq!(GroupRule::FirstWord.key("proj 2024-01-01"), "proj");
    }

    #[test]
    fn test_version_prefix_rule() {
        assert_eq!(GroupRule::VersionPrefix.key("12.4.1 (16G102)"), "12.4.1");
        assert_eq!(GroupRule::VersionPrefix.key("17.2 (21C62) arm64e"), "17.2");
        assert_eq!(GroupRule::VersionPrefix.key("iPhone14,2 17.0"), "iPhone14,2");
    }

    #[test]
    fn test_archives_nested_and_root_level() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let old = root.join("2024-01-01/proj 2024-01-01, 09.00.xcarchive");
        let new = root.join("2024-02-01/proj 2024-02-01, 09.00.xcarchive");
        let loose = root.join("other 2024-01-01.xcarchive");
        mkdir(&old);
        mkdir(&new);
        mkdir(&loose);
        fs::write(root.join("2024-01-01/notes.txt"), "x").unwrap();

        let mut entries = discover_archives(&LocalFs, root).unwrap();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        let keys: Vec<_> = entries.iter().map(|e| e.group_key.as_str()).collect();
        assert_eq!(keys, vec!["proj", "proj", "other"]);
    }

    #[test]
    fn test_archives_keep_latest_by_mtime() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let a = root.join("2024-01-01/proj 2024-01-01.xcarchive");
        let b = root.join("2024-02-01/proj 2024-02-01.xcarchive");
        let c = root.join("2024-01-01/other 2024-01-01.xcarchive");
        for p in [&a, &b, &c] {
            mkdir(p);
        }
        touch(&a, 1_700_000_000);
        touch(&b, 1_700_100_000);
        touch(&c, 1_700_000_000);

        let entries = discover_archives(&LocalFs, root).unwrap();
        let decision = partition(entries, Policy::KeepNewestPerGroup, &LocalFs);

        let removed: Vec<_> = decision.to_remove.iter().map(|e| e.path.clone()).collect();
        assert_eq!(removed, vec![a]);
        assert_eq!(decision.to_keep.len(), 2);
    }

    #[test]
    fn test_device_support_scenario() {
        let tmp = TempDir::new().unwrap();
        let newer = tmp.path().join("12.4.1 (16G102)");
        let older = tmp.path().join("12.4.1 (16G97)");
        mkdir(&newer);
        mkdir(&older);
        touch(&newer, 1_700_000_500);
        touch(&older, 1_700_000_000);

        let entries = discover_device_support(&LocalFs, tmp.path()).unwrap();
        assert!(entries.iter().all(|e| e.group_key == "12.4.1"));

        let decision = partition(entries, Policy::KeepNewestPerGroup, &LocalFs);
        assert_eq!(decision.to_keep[0].path, newer);
        assert_eq!(decision.to_remove[0].path, older);
    }

    #[test]
    fn test_missing_root_is_path_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("Archives");
        assert!(matches!(
            discover_archives(&LocalFs, &missing),
            Err(CleanError::PathNotFound(p)) if p == missing
        ));
        assert!(discover_device_support(&LocalFs, &missing).is_err());
        assert!(discover_derived_data(&LocalFs, &missing).is_err());
    }

    #[test]
    fn test_derived_data_entries_are_children() {
        let tmp = TempDir::new().unwrap();
        mkdir(&tmp.path().join("App-abc/Build"));
        mkdir(&tmp.path().join("ModuleCache.noindex"));

        let entries = discover_derived_data(&LocalFs, tmp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.path.parent() == Some(tmp.path())));
    }

    #[test]
    fn test_simulator_content_areas() {
        let tmp = TempDir::new().unwrap();
        let device = tmp.path().join("0A1B-DEVICE");
        mkdir(&device.join("data/Containers"));
        mkdir(&device.join("Library/Caches"));
        fs::create_dir_all(device.join("tmp")).unwrap();
        fs::write(device.join("tmp/scratch"), "x").unwrap();
        fs::write(device.join("device.plist"), "x").unwrap();

        let found = discover_simulator_content(&LocalFs, tmp.path()).unwrap();
        let data = found.iter().filter(|s| s.area == SimulatorArea::Data).count();
        let cache = found.iter().filter(|s| s.area == SimulatorArea::Cache).count();
        assert_eq!(data, 1);
        assert_eq!(cache, 2);
        assert!(found.iter().all(|s| s.entry.path != device.join("device.plist")));
    }
}
