//! Command modules - one file per top-level command

pub mod brew;
pub mod completions;
pub mod docker;
pub mod network;
pub mod ports;
pub mod system;
pub mod xcode;

use crate::ui::{Output, Reported, format_size};
use anyhow::Result;
use mactools_core::ExecuteReport;

/// How many removal errors are listed before the rest are summarised.
const ERRORS_SHOWN: usize = 5;

/// Report `e` through `out` unless that has already happened.
pub fn report_error(out: &Output, e: anyhow::Error) -> anyhow::Error {
    if e.is::<Reported>() {
        e
    } else {
        out.fail(format!("{e:#}"))
    }
}

/// Run a command body, reporting any unreported error in the current mode.
pub fn finish(out: &Output, result: Result<()>) -> Result<()> {
    result.map_err(|e| report_error(out, e))
}

/// Freed bytes and the first few failures of a removal pass.
pub fn show_report(out: &Output, report: &ExecuteReport) {
    if report.removed_count > 0 {
        out.success(&format!(
            "Freed {} from {} item(s)",
            format_size(report.removed_bytes),
            report.removed_count
        ));
    }
    if report.errors.is_empty() {
        return;
    }
    out.warning(&format!("{} item(s) could not be removed:", report.errors.len()));
    for err in report.errors.iter().take(ERRORS_SHOWN) {
        out.line(&format!("    - {err}"));
    }
    if report.errors.len() > ERRORS_SHOWN {
        out.line(&format!("    - ...and {} more", report.errors.len() - ERRORS_SHOWN));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_errors_pass_through() {
        let out = Output::new(false);
        let err = report_error(&out, anyhow::Error::new(Reported));
        assert!(err.is::<Reported>());
    }

    #[test]
    fn test_plain_errors_become_reported() {
        let out = Output::new(false);
        let result = finish(&out, Err(anyhow::anyhow!("brew exited with 1")));
        assert!(result.unwrap_err().is::<Reported>());
    }
}
