//! Optional user configuration.
//!
//! Read from `~/.config/mactools/config.toml` unless another path is given.
//! Every key is optional; a missing file yields [`Config::default`].

use crate::error::ConfigError;
use crate::inuse::DEFAULT_LOCK_MARKERS;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Top-level config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[xcode]` table.
    pub xcode: XcodeConfig,
    /// `[ports]` table.
    pub ports: PortsConfig,
}

/// Settings for `xcode cleanup`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct XcodeConfig {
    /// Default for `--keep-latest` when the flag is absent.
    pub keep_latest: bool,
    /// File-name substrings that mark a directory as in use.
    pub lock_markers: Vec<String>,
}

impl Default for XcodeConfig {
    fn default() -> Self {
        Self {
            keep_latest: false,
            lock_markers: DEFAULT_LOCK_MARKERS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Settings for the port tools.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// Connect timeout for `ports scan`, in milliseconds.
    pub scan_timeout_ms: u64,
    /// Extra named port groups, merged over the built-in ones.
    pub groups: BTreeMap<String, Vec<u16>>,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            scan_timeout_ms: 500,
            groups: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] if the file exists but cannot be read,
    /// [`ConfigError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML deserialization error.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.xcode.keep_latest);
        assert_eq!(config.xcode.lock_markers.len(), 3);
        assert_eq!(config.ports.scan_timeout_ms, 500);
        assert!(config.ports.groups.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse(
            r#"
[xcode]
keep_latest = true

[ports.groups]
infra = [2375, 6443]
"#,
        )
        .unwrap();
        assert!(config.xcode.keep_latest);
        assert_eq!(config.xcode.lock_markers.len(), 3);
        assert_eq!(config.ports.scan_timeout_ms, 500);
        assert_eq!(config.ports.groups["infra"], vec![2375, 6443]);
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("absent.toml")).unwrap();
        assert!(!config.xcode.keep_latest);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[xcode]\nkeep_latest = \"sometimes\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
