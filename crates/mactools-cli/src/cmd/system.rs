//! `mactools system` - information and temporary file cleanup

use super::{finish, show_report};
use crate::TempArgs;
use crate::ui::progress::ProgressReporter;
use crate::ui::{Output, Reported, format_size, table};
use anyhow::Result;
use chrono::Local;
use mactools_core::temp::{self, TempTarget};
use mactools_core::{CleanError, ExecuteReport, LocalFs, NullReporter, Policy, reaper, sysinfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Counters worth showing in text mode; JSON carries every counter.
const HEADLINE_STATS: &[&str] = &[
    "Pages free",
    "Pages active",
    "Pages inactive",
    "Pages wired down",
    "Pages occupied by compressor",
];

#[derive(Debug, Serialize)]
struct InfoReport {
    success: bool,
    collected_at: String,
    #[serde(flatten)]
    info: sysinfo::SystemInfo,
}

pub fn info(json: bool) -> Result<()> {
    let out = Output::new(json);
    let report = InfoReport {
        success: true,
        collected_at: Local::now().to_rfc3339(),
        info: sysinfo::collect(),
    };

    if out.is_json() {
        return out.json(&report);
    }

    out.section("System");
    out.detail("System", &report.info.system);
    out.detail("macOS version", &report.info.version);
    out.detail("Processor", &report.info.processor);

    match &report.info.memory {
        Some(vm) => {
            out.section("Memory");
            let rows = vm
                .stats
                .iter()
                .filter(|s| HEADLINE_STATS.contains(&s.name.as_str()))
                .map(|s| vec![s.name.clone(), format_size(s.bytes)]);
            out.line(&table::build(&["Counter", "Size"], rows).to_string());
        }
        None => out.warning("Memory statistics unavailable (vm_stat failed)"),
    }
    Ok(())
}

/// Per-location outcome of a temp cleanup.
#[derive(Debug, Serialize)]
struct TargetSummary {
    description: &'static str,
    path: PathBuf,
    skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    items: usize,
    bytes: u64,
    formatted_bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ExecuteReport>,
}

impl TargetSummary {
    fn skipped(target: TempTarget, path: PathBuf, reason: String) -> Self {
        Self {
            description: target.description(),
            path,
            skipped: true,
            reason: Some(reason),
            items: 0,
            bytes: 0,
            formatted_bytes: format_size(0),
            report: None,
        }
    }
}

/// Locations selected by the flags; `--caches --tmp` when none are given.
pub fn selected_targets(args: &TempArgs) -> Vec<TempTarget> {
    if args.all {
        return TempTarget::ALL.to_vec();
    }
    let flags = [
        (args.caches, TempTarget::Caches),
        (args.logs, TempTarget::Logs),
        (args.app_caches, TempTarget::AppCaches),
        (args.tmp, TempTarget::Tmp),
        (args.var_folders, TempTarget::VarFolders),
    ];
    let chosen: Vec<TempTarget> = flags
        .into_iter()
        .filter_map(|(on, target)| on.then_some(target))
        .collect();
    if chosen.is_empty() {
        vec![TempTarget::Caches, TempTarget::Tmp]
    } else {
        chosen
    }
}

pub fn cleanup_temp(args: TempArgs) -> Result<()> {
    let out = Output::new(args.json);
    finish(&out, run_cleanup_temp(&args, &out))
}

fn run_cleanup_temp(args: &TempArgs, out: &Output) -> Result<()> {
    let fs = LocalFs;
    let simulate = !args.force;
    if simulate {
        out.info("Simulation mode: nothing will be deleted. Pass --force to clean.");
    }

    let mut summaries: BTreeMap<&'static str, TargetSummary> = BTreeMap::new();
    let mut total_bytes = 0;
    let mut combined = ExecuteReport::default();

    for target in selected_targets(args) {
        let root = target.path();
        out.section(&format!("{}: {}", target.description(), root.display()));

        let entries = match temp::discover(&fs, target, &root) {
            Ok(entries) => entries,
            Err(CleanError::PathNotFound(path)) => {
                out.info("Directory not found, skipping");
                let reason = "directory not found".to_string();
                summaries.insert(target.key(), TargetSummary::skipped(target, path, reason));
                continue;
            }
            Err(e) => {
                tracing::warn!(target = target.key(), "{e}");
                out.warning(&format!("Skipping: {e}"));
                summaries.insert(target.key(), TargetSummary::skipped(target, root, e.to_string()));
                continue;
            }
        };

        let decision = reaper::partition(entries, Policy::RemoveAll, &fs);
        let items = decision.to_remove.len();
        total_bytes += decision.bytes_to_free;
        out.detail("Items", &items.to_string());
        out.detail(
            if simulate { "Would free" } else { "To free" },
            &format_size(decision.bytes_to_free),
        );

        let report = if simulate || items == 0 {
            None
        } else if out.is_json() {
            Some(reaper::execute(&decision.to_remove, &fs, &NullReporter))
        } else {
            let progress = ProgressReporter::new(items, "Deleting");
            let report = reaper::execute(&decision.to_remove, &fs, &progress);
            progress.finish();
            show_report(out, &report);
            Some(report)
        };
        if let Some(report) = &report {
            combined.merge(report.clone());
        }

        summaries.insert(
            target.key(),
            TargetSummary {
                description: target.description(),
                path: root,
                skipped: false,
                reason: None,
                items,
                bytes: decision.bytes_to_free,
                formatted_bytes: format_size(decision.bytes_to_free),
                report,
            },
        );
    }

    // Fails only when every attempted deletion across all locations failed.
    let success = !combined.all_failed();
    if out.is_json() {
        out.json(&serde_json::json!({
            "success": success,
            "simulated": simulate,
            "total_bytes": total_bytes,
            "formatted_total": format_size(total_bytes),
            "targets": summaries,
            "report": (!simulate).then_some(&combined),
        }))?;
    } else {
        out.section("Total");
        out.detail(
            if simulate { "Would free" } else { "Selected" },
            &format_size(total_bytes),
        );
    }

    if success { Ok(()) } else { Err(Reported.into()) }
}
