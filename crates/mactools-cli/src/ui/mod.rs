//! UI Module - terminal output concerns
//!
//! Commands talk to [`Output`] for themed messages, to [`table`] for tabular
//! data and to [`progress`] for bars while the reaper works. JSON goes
//! straight to stdout through [`output::print_json`]; logs go to stderr.
//!
//! - [`theme`] - Colors, icons and size formatting
//! - [`output`] - Message API and JSON emission
//! - [`table`] - comfy-table rendering
//! - [`progress`] - indicatif bars, including the reaper's reporter
//! - [`prompt`] - y/N confirmation

pub mod output;
pub mod progress;
pub mod prompt;
pub mod table;
pub mod theme;

pub use output::{Output, Reported};
pub use theme::{Theme, format_size};
