//! Core library for mactools.
//!
//! The centre of the crate is the retention [`reaper`]: every disk cleanup
//! discovers [`Entry`] values, plans with [`reaper::partition`] and removes
//! with [`reaper::execute`]. Around it sit filesystem primitives, the Xcode
//! and temp-file discovery rules, and parsers for the output of the macOS
//! tools the CLI wraps (`lsof`, `ifconfig`, `scutil`, `netstat`, `vm_stat`,
//! `brew`, `docker`). Parsers take `&str` and never spawn processes.

pub mod brew;
pub mod config;
pub mod docker;
pub mod error;
pub mod fs;
pub mod inuse;
pub mod network;
pub mod paths;
pub mod ports;
pub mod process;
pub mod reaper;
pub mod reporter;
pub mod sysinfo;
pub mod temp;
pub mod xcode;

pub use config::Config;
pub use error::{CleanError, ConfigError, EntryError, PortError, ToolError};
pub use fs::{FileSystem, LocalFs};
pub use reaper::{Entry, ExecuteReport, Policy, Recency, RetentionDecision};
pub use reporter::{NullReporter, Reporter};
