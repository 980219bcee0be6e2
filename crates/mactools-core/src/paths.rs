//! Well-known locations under the user's home directory.
//!
//! Every path is derived from [`try_home`], so `MACTOOLS_HOME` relocates all of them.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the user's home directory, or None if it cannot be resolved.
///
/// `MACTOOLS_HOME` takes precedence, which lets tests point every
/// `~/Library/...` path at a scratch directory.
pub fn try_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("MACTOOLS_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir()
}

/// Like [`try_home`], falling back to the current directory.
pub fn home() -> PathBuf {
    try_home().unwrap_or_else(|| PathBuf::from("."))
}

/// `~/Library`
pub fn library() -> PathBuf {
    home().join("Library")
}

/// `~/Library/Developer/Xcode`
pub fn xcode_dir() -> PathBuf {
    library().join("Developer").join("Xcode")
}

/// `~/Library/Developer/Xcode/DerivedData`
pub fn derived_data() -> PathBuf {
    xcode_dir().join("DerivedData")
}

/// `~/Library/Developer/Xcode/Archives`
pub fn archives() -> PathBuf {
    xcode_dir().join("Archives")
}

/// `~/Library/Developer/Xcode/iOS DeviceSupport`
pub fn device_support() -> PathBuf {
    xcode_dir().join("iOS DeviceSupport")
}

/// `~/Library/Developer/CoreSimulator/Devices`
pub fn simulator_devices() -> PathBuf {
    library().join("Developer").join("CoreSimulator").join("Devices")
}

/// `~/Library/Caches`
pub fn user_caches() -> PathBuf {
    library().join("Caches")
}

/// `~/Library/Logs`
pub fn user_logs() -> PathBuf {
    library().join("Logs")
}

/// `~/Library/Application Support/Caches`
pub fn app_caches() -> PathBuf {
    library().join("Application Support").join("Caches")
}

/// Default config file: ~/.config/mactools/config.toml
pub fn config_file() -> PathBuf {
    home().join(".config").join("mactools").join("config.toml")
}
