//! `mactools brew` - Homebrew housekeeping

use super::finish;
use crate::ui::{Output, Reported, format_size, table};
use anyhow::{Result, bail};
use mactools_core::brew::{self, BREW, BrewDirs, BrewSizes};
use mactools_core::{LocalFs, process};
use serde::Serialize;

/// Every subcommand starts here: `brew` on PATH, then its directories.
fn measure() -> Result<(BrewDirs, BrewSizes)> {
    brew::ensure_installed()?;
    let dirs = BrewDirs::query()?;
    let sizes = BrewSizes::measure(&LocalFs, &dirs);
    Ok((dirs, sizes))
}

pub fn size(json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_size(&out))
}

fn run_size(out: &Output) -> Result<()> {
    let (dirs, sizes) = measure()?;
    if out.is_json() {
        return out.json(&serde_json::json!({
            "success": true,
            "sizes": sizes,
            "formatted_total": format_size(sizes.total),
        }));
    }
    out.section("Homebrew disk usage");
    out.detail("Cache", &dirs.cache.display().to_string());
    out.detail("Cellar", &dirs.cellar.display().to_string());
    out.line(&table::sizes(&sizes.rows()).to_string());
    Ok(())
}

#[derive(Debug, Serialize)]
struct CleanupReport {
    success: bool,
    dry_run: bool,
    before: BrewSizes,
    after: BrewSizes,
    /// Bytes freed, or the bytes brew says it would free on a dry run.
    savings: u64,
    formatted_savings: String,
}

pub fn cleanup(dry_run: bool, json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_cleanup(dry_run, &out))
}

fn run_cleanup(dry_run: bool, out: &Output) -> Result<()> {
    let (dirs, before) = measure()?;
    out.section(if dry_run {
        "Homebrew cleanup (dry run)"
    } else {
        "Homebrew cleanup"
    });

    let args: &[&str] = if dry_run {
        &["cleanup", "--dry-run"]
    } else {
        &["cleanup"]
    };
    let result = brew::run(args)?.check(BREW)?;

    let (after, savings) = if dry_run {
        (before, brew::parse_cleanup_savings(&result.stdout))
    } else {
        let after = BrewSizes::measure(&LocalFs, &dirs);
        (after, before.total.saturating_sub(after.total))
    };

    let report = CleanupReport {
        success: true,
        dry_run,
        before,
        after,
        savings,
        formatted_savings: format_size(savings),
    };
    if out.is_json() {
        return out.json(&report);
    }

    out.detail("Before", &format_size(before.total));
    if dry_run {
        out.detail("Would free", &report.formatted_savings);
    } else {
        out.detail("After", &format_size(after.total));
        out.success(&format!("Freed {}", report.formatted_savings));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct Leaf {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<Vec<String>>,
}

pub fn leaves(with_deps: bool, json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_leaves(with_deps, &out))
}

fn run_leaves(with_deps: bool, out: &Output) -> Result<()> {
    brew::ensure_installed()?;
    let names = brew::parse_leaves(&brew::run(&["leaves"])?.check(BREW)?.stdout);

    let mut leaves = Vec::with_capacity(names.len());
    for name in names {
        let dependencies = if with_deps {
            let tree = brew::run(&["deps", "--tree", name.as_str()])?.check(BREW)?;
            Some(brew::parse_deps_tree(&tree.stdout, &name))
        } else {
            None
        };
        leaves.push(Leaf { name, dependencies });
    }

    if out.is_json() {
        return out.json(&serde_json::json!({ "success": true, "leaves": leaves }));
    }

    out.section(&format!("{} leaf formula(e)", leaves.len()));
    for leaf in &leaves {
        out.line(&format!("  {}", leaf.name));
        if let Some(deps) = &leaf.dependencies {
            for dep in deps {
                out.line(&format!("      {dep}"));
            }
        }
    }
    Ok(())
}

pub fn update(json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_update(&out))
}

fn run_update(out: &Output) -> Result<()> {
    brew::ensure_installed()?;
    out.section("Updating Homebrew");

    if out.is_json() {
        let result = brew::run(&["update"])?;
        let ok = result.success();
        out.json(&serde_json::json!({
            "success": ok,
            "output": result.stdout.trim(),
            "error": (!ok).then(|| result.stderr.trim().to_string()),
        }))?;
        return if ok { Ok(()) } else { Err(Reported.into()) };
    }

    let code = process::run_inherited(BREW, ["update"])?;
    if code != 0 {
        bail!("brew update exited with {code}");
    }
    out.success("Homebrew is up to date");
    Ok(())
}

pub fn doctor(json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_doctor(&out))
}

fn run_doctor(out: &Output) -> Result<()> {
    brew::ensure_installed()?;
    // Exits 1 whenever it has warnings, so the status alone is not a failure.
    let result = brew::run(&["doctor"])?;
    let has_issues = brew::doctor_has_issues(&result);

    if out.is_json() {
        return out.json(&serde_json::json!({
            "success": true,
            "has_issues": has_issues,
            "output": result.stdout.trim(),
            "warnings": result.stderr.trim(),
        }));
    }

    out.section("brew doctor");
    for text in [result.stdout.trim(), result.stderr.trim()] {
        if !text.is_empty() {
            out.line(text);
        }
    }
    if has_issues {
        out.warning("Homebrew reported issues");
    } else {
        out.success("Your system is ready to brew");
    }
    Ok(())
}
