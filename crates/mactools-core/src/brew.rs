//! Homebrew wrappers and output parsers.

use crate::error::ToolError;
use crate::fs::FileSystem;
use crate::process::{self, ToolOutput};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Binary name on `PATH`.
pub const BREW: &str = "brew";

static SAVINGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+(?:\.\d+)?)\s*(bytes|B|KB|MB|GB|TB)\)").expect("savings regex is valid")
});

static TREE_GLYPHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s│├└─┬]+").expect("tree glyph regex is valid"));

/// Fail with [`ToolError::NotInstalled`] unless `brew` is on `PATH`.
///
/// # Errors
///
/// [`ToolError::NotInstalled`] naming Homebrew.
pub fn ensure_installed() -> Result<(), ToolError> {
    if process::is_installed(BREW) {
        Ok(())
    } else {
        Err(ToolError::NotInstalled("Homebrew".into()))
    }
}

/// Run `brew <args>` capturing output.
///
/// # Errors
///
/// Propagates spawn failures; a non-zero exit is returned in the output.
pub fn run(args: &[&str]) -> Result<ToolOutput, ToolError> {
    process::run(BREW, args)
}

/// Homebrew's on-disk locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewDirs {
    /// Download cache (`brew --cache`).
    pub cache: PathBuf,
    /// Installed formulae (`brew --cellar`).
    pub cellar: PathBuf,
    /// Homebrew's own checkout.
    pub core: PathBuf,
    /// Installed casks.
    pub cask: PathBuf,
}

impl BrewDirs {
    /// Derive the layout from `brew --cache` and `brew --cellar`. Core and
    /// Caskroom sit next to the Cellar.
    pub fn from_paths(cache: &str, cellar: &str) -> Self {
        let cellar = PathBuf::from(cellar.trim());
        let prefix = cellar.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            cache: PathBuf::from(cache.trim()),
            core: prefix.join("Homebrew"),
            cask: prefix.join("Caskroom"),
            cellar,
        }
    }

    /// Ask `brew` for its layout.
    ///
    /// # Errors
    ///
    /// Fails if either `brew` query fails.
    pub fn query() -> Result<Self, ToolError> {
        let cache = run(&["--cache"])?.check(BREW)?;
        let cellar = run(&["--cellar"])?.check(BREW)?;
        Ok(Self::from_paths(&cache.stdout, &cellar.stdout))
    }
}

/// Bytes used by each [`BrewDirs`] location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrewSizes {
    /// Download cache.
    pub cache: u64,
    /// Cellar.
    pub cellar: u64,
    /// Homebrew checkout.
    pub core: u64,
    /// Caskroom.
    pub cask: u64,
    /// Sum of the four above.
    pub total: u64,
}

impl BrewSizes {
    /// Measure each location; missing ones count as zero.
    pub fn measure<F: FileSystem + ?Sized>(fs: &F, dirs: &BrewDirs) -> Self {
        let size = |p: &Path| if p.exists() { fs.dir_size(p) } else { 0 };
        let cache = size(&dirs.cache);
        let cellar = size(&dirs.cellar);
        let core = size(&dirs.core);
        let cask = size(&dirs.cask);
        Self {
            cache,
            cellar,
            core,
            cask,
            total: cache + cellar + core + cask,
        }
    }

    /// `(label, bytes)` rows in display order.
    pub fn rows(&self) -> [(&'static str, u64); 5] {
        [
            ("Cache", self.cache),
            ("Cellar", self.cellar),
            ("Core", self.core),
            ("Cask", self.cask),
            ("Total", self.total),
        ]
    }
}

/// Sum the size annotations in `brew cleanup --dry-run` output, accepting
/// both `(1234 bytes)` and `(12.3MB)` forms.
pub fn parse_cleanup_savings(output: &str) -> u64 {
    SAVINGS
        .captures_iter(output)
        .filter_map(|c| {
            let value: f64 = c[1].parse().ok()?;
            let multiplier: f64 = match &c[2] {
                "bytes" | "B" => 1.0,
                "KB" => 1024.0,
                "MB" => 1024.0 * 1024.0,
                "GB" => 1024.0 * 1024.0 * 1024.0,
                "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
                _ => return None,
            };
            Some((value * multiplier).round() as u64)
        })
        .sum()
}

/// Non-empty trimmed lines of `brew leaves`.
pub fn parse_leaves(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Dependencies from `brew deps --tree <leaf>`, tree glyphs stripped and
/// the leaf's own line skipped.
pub fn parse_deps_tree(output: &str, leaf: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with(leaf))
        .map(|line| TREE_GLYPHS.replace(line, "").trim().to_string())
        .filter(|dep| !dep.is_empty())
        .collect()
}

/// Whether `brew doctor` found anything worth mentioning.
pub fn doctor_has_issues(out: &ToolOutput) -> bool {
    !out.success()
        || out.stdout.to_lowercase().contains("warning")
        || out.stderr.to_lowercase().contains("warning")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_from_paths() {
        let dirs = BrewDirs::from_paths("/Users/dev/Library/Caches/Homebrew\n", "/opt/homebrew/Cellar\n");
        assert_eq!(dirs.cache, PathBuf::from("/Users/dev/Library/Caches/Homebrew"));
        assert_eq!(dirs.cellar, PathBuf::from("/opt/homebrew/Cellar"));
        assert_eq!(dirs.core, PathBuf::from("/opt/homebrew/Homebrew"));
        assert_eq!(dirs.cask, PathBuf::from("/opt/homebrew/Caskroom"));
    }

    #[test]
    fn test_cleanup_savings_both_forms() {
        let out = "\
Would remove: /Users/dev/Library/Caches/Homebrew/wget--1.21.tar.gz (1024 bytes)
Would remove: /opt/homebrew/Cellar/node/20.1.0 (2,345 files, 1.5MB)
Would remove: /Users/dev/Library/Caches/Homebrew/go--1.22.bottle.tar.gz (2KB)
==> This operation would free approximately 1.5MB of disk space.
";
        // "(2,345 files, 1.5MB)" does not match the bare-size form and is skipped.
        assert_eq!(parse_cleanup_savings(out), 1024 + 2048);
        assert_eq!(parse_cleanup_savings("(12.3MB)"), (12.3_f64 * 1024.0 * 1024.0).round() as u64);
        assert_eq!(parse_cleanup_savings("nothing to clean"), 0);
    }

    #[test]
    fn test_parse_leaves() {
        assert_eq!(parse_leaves("git\n\n  wget \nripgrep\n"), vec!["git", "wget", "ripgrep"]);
    }

    #[test]
    fn test_parse_deps_tree() {
        let out = "\
git
├── gettext
│   └── libunistring
└── pcre2
";
        assert_eq!(parse_deps_tree(out, "git"), vec!["gettext", "libunistring", "pcre2"]);
    }

    #[test]
    fn test_doctor_issues() {
        let clean = ToolOutput {
            code: 0,
            stdout: "Your system is ready to brew.\n".into(),
            stderr: String::new(),
        };
        assert!(!doctor_has_issues(&clean));

        let warned = ToolOutput {
            code: 0,
            stdout: String::new(),
            stderr: "Warning: Some installed formulae are deprecated".into(),
        };
        assert!(doctor_has_issues(&warned));

        let failed = ToolOutput {
            code: 1,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(doctor_has_issues(&failed));
    }

    #[test]
    fn test_sizes_rows_and_missing_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("Cellar/x")).unwrap();
        std::fs::write(tmp.path().join("Cellar/x/bin"), [0u8; 10]).unwrap();
        let dirs = BrewDirs::from_paths(
            tmp.path().join("cache-missing").to_str().unwrap(),
            tmp.path().join("Cellar").to_str().unwrap(),
        );

        let sizes = BrewSizes::measure(&crate::fs::LocalFs, &dirs);
        assert_eq!(sizes.cellar, 10);
        assert_eq!(sizes.total, 10);
        assert_eq!(sizes.rows()[4], ("Total", 10));
    }
}
