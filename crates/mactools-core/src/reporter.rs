//! Reporter trait for dependency injection
//!
//! The reaper reports per-entry progress through this trait so that core
//! logic stays independent of how (or whether) it is rendered.

use std::path::Path;

/// Receives per-entry callbacks from [`crate::reaper::execute`].
pub trait Reporter {
    /// A removal is about to be attempted.
    fn removing(&self, path: &Path);

    /// The entry at `path` was removed, freeing `bytes`.
    fn removed(&self, path: &Path, bytes: u64);

    /// The entry at `path` could not be removed.
    fn failed(&self, path: &Path, reason: &str);
}

impl<T: Reporter + ?Sized> Reporter for &T {
    fn removing(&self, path: &Path) {
        (**self).removing(path);
    }
    fn removed(&self, path: &Path, bytes: u64) {
        (**self).removed(path, bytes);
    }
    fn failed(&self, path: &Path, reason: &str) {
        (**self).failed(path, reason);
    }
}

/// A no-op reporter for silent operations (e.g., JSON output, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn removing(&self, _: &Path) {}
    fn removed(&self, _: &Path, _: u64) {}
    fn failed(&self, _: &Path, _: &str) {}
}
