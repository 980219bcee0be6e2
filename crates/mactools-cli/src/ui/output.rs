//! Themed message output and JSON emission.
//!
//! In JSON mode stdout carries exactly one JSON document, so the message
//! helpers go quiet and failures are reported as `{"success": false, ...}`.

use super::theme::{Theme, format_size};
use crossterm::style::Stylize;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Marker error: the failure has already been shown to the user and only
/// the exit code remains to be set.
#[derive(Debug)]
pub struct Reported;

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failure already reported")
    }
}

impl std::error::Error for Reported {}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Output {
    theme: Theme,
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            theme: Theme::default(),
            json,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Bold section header preceded by a blank line.
    pub fn section(&self, title: &str) {
        if !self.json {
            println!();
            println!("{}", title.bold().with(self.theme.colors.header));
        }
    }

    pub fn info(&self, msg: &str) {
        if !self.json {
            println!("{} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.json {
            println!("{} {msg}", self.theme.icons.success.with(self.theme.colors.success));
        }
    }

    pub fn warning(&self, msg: &str) {
        if !self.json {
            println!("{} {msg}", self.theme.icons.warning.with(self.theme.colors.warning));
        }
    }

    /// Errors always go to stderr, even in JSON mode.
    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", self.theme.icons.error.with(self.theme.colors.error));
    }

    /// Indented `label: value` line.
    pub fn detail(&self, label: &str, value: &str) {
        if !self.json {
            println!("  {}: {value}", label.with(self.theme.colors.secondary));
        }
    }

    /// Plain line, suppressed in JSON mode.
    pub fn line(&self, text: &str) {
        if !self.json {
            println!("{text}");
        }
    }

    /// One entry of a cleanup plan: `● name  12.0 MB` (or `○` when kept).
    pub fn entry(&self, path: &Path, size: Option<u64>, kept: bool) {
        if self.json {
            return;
        }
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let icon = if kept {
            self.theme.icons.pending.with(self.theme.colors.secondary)
        } else {
            self.theme.icons.active.with(self.theme.colors.warning)
        };
        match size {
            Some(bytes) => println!(
                "  {icon} {}  {}",
                name.with(self.theme.colors.primary),
                format_size(bytes).with(self.theme.colors.secondary)
            ),
            None => println!("  {icon} {}", name.with(self.theme.colors.primary)),
        }
    }

    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        print_json(value)
    }

    /// Report a failure in the current mode and return [`Reported`].
    pub fn fail(&self, msg: impl fmt::Display) -> anyhow::Error {
        let msg = msg.to_string();
        if self.json {
            let body = serde_json::json!({ "success": false, "error": msg });
            if let Err(e) = print_json(&body) {
                return e;
            }
        } else {
            self.error(&msg);
        }
        anyhow::Error::new(Reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_returns_reported_marker() {
        let out = Output::new(false);
        let err = out.fail("Archives directory not found");
        assert!(err.downcast_ref::<Reported>().is_some());
    }

    #[test]
    fn test_json_mode_flag() {
        assert!(Output::new(true).is_json());
        assert!(!Output::new(false).is_json());
    }
}
