//! Xcode cleanup commands

use super::{report_error, show_report};
use crate::ui::progress::ProgressReporter;
use crate::ui::{Output, Reported, format_size, prompt};
use crate::{CleanupArgs, RetentionArgs, XcodeTarget};
use anyhow::{Result, bail};
use mactools_core::xcode::{self, SimulatorArea};
use mactools_core::{
    CleanError, Config, Entry, ExecuteReport, FileSystem, LocalFs, NullReporter, Policy, inuse,
    paths, reaper,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Which Xcode location a cleanup works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    DerivedData,
    Archives,
    DeviceSupport,
    Simulators,
}

impl Target {
    pub const ALL: [Self; 4] = [
        Self::DerivedData,
        Self::Archives,
        Self::DeviceSupport,
        Self::Simulators,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::DerivedData => "derived_data",
            Self::Archives => "archives",
            Self::DeviceSupport => "device_support",
            Self::Simulators => "simulators",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DerivedData => "DerivedData",
            Self::Archives => "Archives",
            Self::DeviceSupport => "iOS DeviceSupport",
            Self::Simulators => "Simulator content",
        }
    }

    pub fn root(self) -> PathBuf {
        match self {
            Self::DerivedData => paths::derived_data(),
            Self::Archives => paths::archives(),
            Self::DeviceSupport => paths::device_support(),
            Self::Simulators => paths::simulator_devices(),
        }
    }

    /// Only archives and device support have groups worth keeping one of.
    fn supports_keep_latest(self) -> bool {
        matches!(self, Self::Archives | Self::DeviceSupport)
    }
}

#[derive(Debug, Serialize)]
struct PlannedEntry {
    path: PathBuf,
    size: u64,
}

/// Everything one target's cleanup did, in the shape emitted as JSON.
#[derive(Debug, Serialize)]
pub struct CleanupSummary {
    success: bool,
    target: &'static str,
    path: PathBuf,
    dry_run: bool,
    keep_latest: bool,
    cancelled: bool,
    kept: Vec<PathBuf>,
    to_remove: Vec<PlannedEntry>,
    bytes_to_free: u64,
    formatted_bytes_to_free: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ExecuteReport>,
}

/// Entry point for `mactools xcode cleanup <target>`.
pub fn cleanup(target: XcodeTarget, config: &Config) -> Result<()> {
    match target {
        XcodeTarget::DerivedData(args) => single(Target::DerivedData, args, false, config),
        XcodeTarget::Archives(args) => single_retained(Target::Archives, args, config),
        XcodeTarget::DeviceSupport(args) => single_retained(Target::DeviceSupport, args, config),
        XcodeTarget::Simulators(args) => single(Target::Simulators, args, false, config),
        XcodeTarget::All(args) => all(args, config),
    }
}

fn single_retained(target: Target, args: RetentionArgs, config: &Config) -> Result<()> {
    let keep_latest = args.keep_latest || config.xcode.keep_latest;
    single(target, args.common, keep_latest, config)
}

fn single(target: Target, args: CleanupArgs, keep_latest: bool, config: &Config) -> Result<()> {
    let out = Output::new(args.json);
    match clean(target, args, keep_latest, config, &out) {
        Ok(summary) => {
            if out.is_json() {
                out.json(&summary)?;
            }
            if summary.success {
                Ok(())
            } else {
                Err(Reported.into())
            }
        }
        Err(e) => Err(report_error(&out, e)),
    }
}

/// Run every target in turn. One target failing does not stop the others.
fn all(args: RetentionArgs, config: &Config) -> Result<()> {
    let out = Output::new(args.common.json);
    let keep_latest = args.keep_latest || config.xcode.keep_latest;

    let mut results: BTreeMap<&'static str, serde_json::Value> = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(Target::ALL.len());

    for target in Target::ALL {
        let keep = keep_latest && target.supports_keep_latest();
        let (ok, value) = match clean(target, args.common, keep, config, &out) {
            Ok(summary) => (summary.success, serde_json::to_value(&summary)?),
            Err(e) => {
                let msg = format!("{e:#}");
                if !out.is_json() {
                    out.error(&msg);
                }
                (false, serde_json::json!({ "success": false, "error": msg }))
            }
        };
        outcomes.push((target, ok));
        results.insert(target.key(), value);
    }

    let all_ok = outcomes.iter().all(|(_, ok)| *ok);
    if out.is_json() {
        out.json(&serde_json::json!({ "success": all_ok, "results": results }))?;
    } else {
        out.section("Summary");
        for (target, ok) in &outcomes {
            if *ok {
                out.success(target.label());
            } else {
                out.error(target.label());
            }
        }
    }

    if all_ok { Ok(()) } else { Err(Reported.into()) }
}

fn discover(
    target: Target,
    fs: &LocalFs,
    root: &std::path::Path,
) -> Result<(Vec<Entry>, HashMap<PathBuf, SimulatorArea>), CleanError> {
    let entries = match target {
        Target::DerivedData => xcode::discover_derived_data(fs, root)?,
        Target::Archives => xcode::discover_archives(fs, root)?,
        Target::DeviceSupport => xcode::discover_device_support(fs, root)?,
        Target::Simulators => {
            let found = xcode::discover_simulator_content(fs, root)?;
            let areas = found
                .iter()
                .map(|s| (s.entry.path.clone(), s.area))
                .collect();
            let entries = found.into_iter().map(|s| s.entry).collect();
            return Ok((entries, areas));
        }
    };
    Ok((entries, HashMap::new()))
}

/// Plan and (unless dry-running) execute one target's cleanup.
fn clean(
    target: Target,
    args: CleanupArgs,
    keep_latest: bool,
    config: &Config,
    out: &Output,
) -> Result<CleanupSummary> {
    let fs = LocalFs;
    let root = target.root();
    out.section(&format!("{}: {}", target.label(), root.display()));

    if !fs.is_dir(&root) {
        return Err(CleanError::PathNotFound(root).into());
    }

    if !args.force {
        if let Some(reason) = inuse::check_in_use(&root, &config.xcode.lock_markers) {
            let err = CleanError::DirectoryInUse { path: root, reason };
            bail!("{err}. Close Xcode or use --force to clean anyway.");
        }
    }

    let (entries, areas) = discover(target, &fs, &root)?;
    let keep_latest = keep_latest && target.supports_keep_latest();
    let policy = if keep_latest {
        Policy::KeepNewestPerGroup
    } else {
        Policy::RemoveAll
    };
    let decision = reaper::partition(entries, policy, &fs);

    let area_size = |wanted: SimulatorArea| -> Option<u64> {
        (target == Target::Simulators).then(|| {
            decision
                .to_remove
                .iter()
                .filter(|e| areas.get(&e.path) == Some(&wanted))
                .map(|e| e.size(&fs))
                .sum()
        })
    };

    let mut summary = CleanupSummary {
        success: true,
        target: target.key(),
        path: root.clone(),
        dry_run: args.dry_run,
        keep_latest,
        cancelled: false,
        kept: decision.to_keep.iter().map(|e| e.path.clone()).collect(),
        to_remove: decision
            .to_remove
            .iter()
            .map(|e| PlannedEntry {
                path: e.path.clone(),
                size: e.size(&fs),
            })
            .collect(),
        bytes_to_free: decision.bytes_to_free,
        formatted_bytes_to_free: format_size(decision.bytes_to_free),
        data_size: area_size(SimulatorArea::Data),
        cache_size: area_size(SimulatorArea::Cache),
        report: None,
    };

    if decision.is_empty() {
        if decision.to_keep.is_empty() {
            out.info("Nothing to clean.");
        } else {
            out.info("Nothing to remove: only the latest of each group is present.");
        }
        return Ok(summary);
    }

    for entry in &decision.to_keep {
        out.entry(&entry.path, None, true);
    }
    for entry in &decision.to_remove {
        out.entry(&entry.path, Some(entry.size(&fs)), false);
    }
    if let (Some(data), Some(cache)) = (summary.data_size, summary.cache_size) {
        out.detail("Simulator data", &format_size(data));
        out.detail("Simulator caches", &format_size(cache));
    }
    let count = decision.to_remove.len();
    let freed = format_size(decision.bytes_to_free);

    if args.dry_run {
        out.detail("Would free", &freed);
        out.info("Dry run: nothing was removed.");
        return Ok(summary);
    }

    if !(args.yes || args.force || out.is_json())
        && !prompt::confirm(&format!("Remove {count} item(s), freeing {freed}?"))?
    {
        out.warning("Cancelled.");
        summary.cancelled = true;
        return Ok(summary);
    }

    let report = if out.is_json() {
        reaper::execute(&decision.to_remove, &fs, &NullReporter)
    } else {
        let progress = ProgressReporter::new(count, "Removing");
        let report = reaper::execute(&decision.to_remove, &fs, &progress);
        progress.finish();
        report
    };

    show_report(out, &report);
    summary.success = !report.all_failed();
    summary.report = Some(report);
    Ok(summary)
}
