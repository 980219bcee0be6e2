//! Progress bars for long-running passes.
//!
//! Bars draw to stderr and hide themselves when it is not a terminal.

use super::theme::Theme;
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use mactools_core::Reporter;
use std::path::Path;

const BAR_TEMPLATE: &str = "  {prefix} [{bar:30.cyan/dim}] {pos}/{len}  {wide_msg:.dim}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("▓▓░")
}

/// A labelled bar of `len` steps.
pub fn bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(bar_style());
    pb.set_prefix(label.to_string());
    pb
}

/// Drives a progress bar from the reaper's per-entry callbacks.
pub struct ProgressReporter {
    bar: ProgressBar,
    theme: Theme,
}

impl ProgressReporter {
    pub fn new(len: usize, label: &str) -> Self {
        Self {
            bar: bar(len as u64, label),
            theme: Theme::default(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Reporter for ProgressReporter {
    fn removing(&self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(name);
    }

    fn removed(&self, _path: &Path, _bytes: u64) {
        self.bar.inc(1);
    }

    fn failed(&self, path: &Path, reason: &str) {
        self.bar.inc(1);
        self.bar.println(format!(
            "  {} {}: {reason}",
            self.theme.icons.error.with(self.theme.colors.error),
            path.display()
        ));
    }
}
