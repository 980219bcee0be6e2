//! `mactools docker cleanup` - containers and images

use super::finish;
use crate::ui::{Output, Reported, format_size, prompt, table};
use crate::{DockerArgs, DockerTarget};
use anyhow::Result;
use mactools_core::docker::{self, RemovalReport};

/// Candidates for one removal pass, already rendered for display.
#[derive(Debug)]
struct Plan {
    kind: &'static str,
    headers: [&'static str; 4],
    rows: Vec<Vec<String>>,
    ids: Vec<String>,
    bytes: Option<u64>,
    items: serde_json::Value,
}

fn plan(target: &DockerTarget) -> Result<Plan> {
    Ok(match target {
        DockerTarget::Containers(args) => {
            let containers = docker::list_containers(args.all)?;
            Plan {
                kind: "container",
                headers: ["ID", "Image", "Status", "Names"],
                rows: containers
                    .iter()
                    .map(|c| vec![c.id.clone(), c.image.clone(), c.status.clone(), c.names.clone()])
                    .collect(),
                ids: containers.iter().map(|c| c.id.clone()).collect(),
                bytes: None,
                items: serde_json::to_value(&containers)?,
            }
        }
        DockerTarget::Images(args) => {
            let images = docker::list_images(args.all)?;
            Plan {
                kind: "image",
                headers: ["ID", "Repository", "Tag", "Size"],
                rows: images
                    .iter()
                    .map(|i| vec![i.id.clone(), i.repository.clone(), i.tag.clone(), i.size.clone()])
                    .collect(),
                ids: images.iter().map(|i| i.id.clone()).collect(),
                bytes: Some(images.iter().map(docker::Image::size_bytes).sum()),
                items: serde_json::to_value(&images)?,
            }
        }
    })
}

pub fn cleanup(target: DockerTarget) -> Result<()> {
    let args = match &target {
        DockerTarget::Containers(args) | DockerTarget::Images(args) => *args,
    };
    let out = Output::new(args.json);
    finish(&out, run_cleanup(&target, args, &out))
}

fn run_cleanup(target: &DockerTarget, args: DockerArgs, out: &Output) -> Result<()> {
    docker::ensure_available()?;
    let plan = plan(target)?;
    let count = plan.ids.len();
    out.section(&format!("{count} {}(s) eligible for removal", plan.kind));

    if count == 0 {
        out.info("Nothing to clean.");
        if out.is_json() {
            out.json(&serde_json::json!({ "success": true, "dry_run": args.dry_run, "items": [] }))?;
        }
        return Ok(());
    }

    out.line(&table::build(&plan.headers, plan.rows.clone()).to_string());
    if let Some(bytes) = plan.bytes {
        out.detail("Reclaimable", &format_size(bytes));
    }

    if args.dry_run {
        out.info("Dry run: nothing was removed.");
        if out.is_json() {
            out.json(&serde_json::json!({
                "success": true,
                "dry_run": true,
                "items": plan.items,
            }))?;
        }
        return Ok(());
    }

    if !(args.yes || out.is_json())
        && !prompt::confirm(&format!("Remove {count} {}(s)?", plan.kind))?
    {
        out.warning("Cancelled.");
        return Ok(());
    }

    let report = match target {
        DockerTarget::Containers(_) => docker::remove_containers(&plan.ids, args.force),
        DockerTarget::Images(_) => docker::remove_images(&plan.ids, args.force),
    };
    show(out, plan.kind, &report);

    if out.is_json() {
        out.json(&serde_json::json!({
            "success": !report.all_failed(),
            "dry_run": false,
            "items": plan.items,
            "removed": report.removed,
            "failed": report.failed,
        }))?;
    }
    if report.all_failed() {
        Err(Reported.into())
    } else {
        Ok(())
    }
}

fn show(out: &Output, kind: &str, report: &RemovalReport) {
    if !report.removed.is_empty() {
        out.success(&format!("Removed {} {kind}(s)", report.removed.len()));
    }
    for failure in &report.failed {
        out.warning(&format!("{}: {}", failure.id, failure.error));
    }
}
