//! Docker container and image cleanup.
//!
//! Listings come from `docker ... --format {{json .}}`, one JSON object per
//! line. Removal is per item so one stubborn container does not block the
//! rest.

use crate::error::ToolError;
use crate::process::{self, ToolOutput};
use serde::{Deserialize, Serialize};

/// Binary name on `PATH`.
pub const DOCKER: &str = "docker";

/// Fail unless the CLI is installed and the daemon answers `docker info`.
///
/// # Errors
///
/// [`ToolError::NotInstalled`] or [`ToolError::Unavailable`].
pub fn ensure_available() -> Result<(), ToolError> {
    if !process::is_installed(DOCKER) {
        return Err(ToolError::NotInstalled(DOCKER.into()));
    }
    let info = run(&["info"])?;
    if !info.success() {
        return Err(ToolError::Unavailable {
            tool: DOCKER.into(),
            reason: "Docker daemon is not running".into(),
        });
    }
    Ok(())
}

fn run(args: &[&str]) -> Result<ToolOutput, ToolError> {
    process::run(DOCKER, args)
}

/// One row of `docker ps --format {{json .}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Short container id.
    #[serde(rename(deserialize = "ID"))]
    pub id: String,
    /// Image as the container was created from (name, `name:tag` or id).
    #[serde(rename(deserialize = "Image"), default)]
    pub image: String,
    /// Human status, e.g. `Exited (0) 2 days ago`.
    #[serde(rename(deserialize = "Status"), default)]
    pub status: String,
    /// Comma-separated container names.
    #[serde(rename(deserialize = "Names"), default)]
    pub names: String,
}

/// One row of `docker images --format {{json .}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Short image id.
    #[serde(rename(deserialize = "ID"))]
    pub id: String,
    /// Repository, `<none>` for dangling images.
    #[serde(rename(deserialize = "Repository"), default)]
    pub repository: String,
    /// Tag, `<none>` for dangling images.
    #[serde(rename(deserialize = "Tag"), default)]
    pub tag: String,
    /// Size as docker prints it, e.g. `1.2GB`.
    #[serde(rename(deserialize = "Size"), default)]
    pub size: String,
}

impl Image {
    /// `repository:tag`.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }

    /// [`Image::size`] in bytes.
    pub fn size_bytes(&self) -> u64 {
        parse_size(&self.size)
    }

    /// Whether a container's `{{.Image}}` value refers to this image.
    pub fn is_referenced_by(&self, used: &str) -> bool {
        if used.is_empty() {
            return false;
        }
        used == self.reference()
            || (self.tag == "latest" && used == self.repository)
            || self.id.starts_with(used)
            || used.trim_start_matches("sha256:").starts_with(&self.id)
    }
}

/// Parse JSON-lines output; lines that do not decode are skipped.
pub fn parse_json_lines<T: for<'de> Deserialize<'de>>(output: &str) -> Vec<T> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| match serde_json::from_str(l) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!("skipping undecodable docker line: {e}");
                None
            }
        })
        .collect()
}

/// Docker's human size (`1.2GB`, `512kB`, `10MB`, `0B`) in bytes.
pub fn parse_size(raw: &str) -> u64 {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let Ok(value) = number.trim().parse::<f64>() else {
        return 0;
    };
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        "TB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return 0,
    };
    (value * multiplier).round() as u64
}

/// Containers eligible for removal: stopped ones, or every one with `all`.
///
/// # Errors
///
/// Spawn failures or a non-zero `docker ps`.
pub fn list_containers(all: bool) -> Result<Vec<Container>, ToolError> {
    let mut args = vec!["ps", "-a", "--format", "{{json .}}"];
    if !all {
        args.extend([
            "--filter",
            "status=exited",
            "--filter",
            "status=created",
            "--filter",
            "status=dead",
        ]);
    }
    let out = run(&args)?.check(DOCKER)?;
    Ok(parse_json_lines(&out.stdout))
}

/// Images eligible for removal: dangling ones, or every one with `all`.
/// Images referenced by any container are never included.
///
/// # Errors
///
/// Spawn failures or a non-zero `docker images`.
pub fn list_images(all: bool) -> Result<Vec<Image>, ToolError> {
    let mut args = vec!["images", "--format", "{{json .}}"];
    if !all {
        args.extend(["--filter", "dangling=true"]);
    }
    let images: Vec<Image> = parse_json_lines(&run(&args)?.check(DOCKER)?.stdout);

    let used = run(&["ps", "-a", "--format", "{{.Image}}"])?.check(DOCKER)?;
    let used: Vec<&str> = used.stdout.lines().map(str::trim).collect();
    Ok(exclude_in_use(images, &used))
}

/// Drop images that any container still references.
pub fn exclude_in_use(images: Vec<Image>, used: &[&str]) -> Vec<Image> {
    images
        .into_iter()
        .filter(|img| !used.iter().any(|u| img.is_referenced_by(u)))
        .collect()
}

/// An item docker refused to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalFailure {
    /// Container or image id.
    pub id: String,
    /// Rendered error from the failed invocation.
    pub error: String,
}

/// Outcome of a per-item removal pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    /// Ids removed.
    pub removed: Vec<String>,
    /// Ids that failed, with the reason.
    pub failed: Vec<RemovalFailure>,
}

impl RemovalReport {
    /// Something was attempted and nothing succeeded.
    pub fn all_failed(&self) -> bool {
        self.removed.is_empty() && !self.failed.is_empty()
    }
}

/// `docker rm [-f] <id>` for each container.
pub fn remove_containers(ids: &[String], force: bool) -> RemovalReport {
    remove_each("rm", ids, force)
}

/// `docker rmi [-f] <id>` for each image.
pub fn remove_images(ids: &[String], force: bool) -> RemovalReport {
    remove_each("rmi", ids, force)
}

fn remove_each(verb: &str, ids: &[String], force: bool) -> RemovalReport {
    let mut report = RemovalReport::default();
    for id in ids {
        let mut args = vec![verb];
        if force {
            args.push("-f");
        }
        args.push(id.as_str());
        match run(&args).and_then(|out| out.check(DOCKER)) {
            Ok(_) => report.removed.push(id.clone()),
            Err(e) => {
                tracing::warn!(id, "docker {verb} failed: {e}");
                report.failed.push(RemovalFailure {
                    id: id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_containers() {
        let out = r#"{"Command":"\"nginx -g…\"","CreatedAt":"2024-01-01","ID":"a1b2c3d4e5f6","Image":"nginx:latest","Names":"web","Status":"Exited (0) 2 days ago"}
not json
{"ID":"ffeeddccbbaa","Image":"redis","Names":"cache","Status":"Created"}
"#;
        let containers: Vec<Container> = parse_json_lines(out);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "a1b2c3d4e5f6");
        assert_eq!(containers[0].image, "nginx:latest");
        assert_eq!(containers[0].names, "web");
        assert_eq!(containers[1].status, "Created");
    }

    #[test]
    fn test_parse_images_and_sizes() {
        let out = r#"{"ID":"0123456789ab","Repository":"<none>","Tag":"<none>","Size":"1.5GB"}
{"ID":"ba9876543210","Repository":"alpine","Tag":"3.19","Size":"7.38MB"}
"#;
        let images: Vec<Image> = parse_json_lines(out);
        assert_eq!(images.len(), 2);
        assert_eq!(images[1].reference(), "alpine:3.19");
        assert_eq!(images[0].size_bytes(), (1.5_f64 * 1024.0 * 1024.0 * 1024.0) as u64);
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("0B"), 0);
        assert_eq!(parse_size("512kB"), 512 * 1024);
        assert_eq!(parse_size("10MB"), 10 * 1024 * 1024);
        assert_eq!(parse_size("42"), 42);
        assert_eq!(parse_size("garbage"), 0);
    }

    #[test]
    fn test_in_use_images_are_excluded() {
        let img = |id: &str, repo: &str, tag: &str| Image {
            id: id.into(),
            repository: repo.into(),
            tag: tag.into(),
            size: "1MB".into(),
        };
        let images = vec![
            img("aaa111", "nginx", "latest"),
            img("bbb222", "redis", "7"),
            img("ccc333", "postgres", "16"),
            img("ddd444", "<none>", "<none>"),
        ];
        let used = ["nginx", "redis:7", "ccc333", ""];

        let left = exclude_in_use(images, &used);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, "ddd444");
    }

    #[test]
    fn test_report_all_failed() {
        let mut report = RemovalReport::default();
        assert!(!report.all_failed());
        report.failed.push(RemovalFailure {
            id: "x".into(),
            error: "busy".into(),
        });
        assert!(report.all_failed());
        report.removed.push("y".into());
        assert!(!report.all_failed());
    }
}
