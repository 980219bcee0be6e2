//! System information: OS version, processor and `vm_stat` memory figures.

use crate::process;
use serde::Serialize;
use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_PAGE_SIZE: u64 = 4096;

static PAGE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"page size of (\d+) bytes").expect("page size regex is valid")
});

/// One `vm_stat` counter converted to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryStat {
    /// Counter name, e.g. `Pages free`.
    pub name: String,
    /// Page count times page size.
    pub bytes: u64,
}

/// Parsed `vm_stat` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmStat {
    /// Bytes per page from the header.
    pub page_size: u64,
    /// Counters in print order.
    pub stats: Vec<MemoryStat>,
}

/// Parse `vm_stat`.
///
/// The header line carries the page size; every `Name: N.` line is a page
/// count. Lines not ending in `.` (e.g. the header itself) are ignored.
pub fn parse_vm_stat(output: &str) -> VmStat {
    let page_size = PAGE_SIZE
        .captures(output)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let stats = output
        .lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let pages: u64 = value.trim().strip_suffix('.')?.parse().ok()?;
            Some(MemoryStat {
                name: name.trim().trim_matches('"').to_string(),
                bytes: pages.saturating_mul(page_size),
            })
        })
        .collect();

    VmStat { page_size, stats }
}

/// Major component of a version string such as `14.2.1`.
pub fn major_version(version: &str) -> Option<u32> {
    version.trim().split('.').next()?.parse().ok()
}

/// Snapshot for `system info`.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// OS name, `macOS` on Darwin.
    pub system: String,
    /// `sw_vers -productVersion`.
    pub version: String,
    /// CPU brand string.
    pub processor: String,
    /// `None` when `vm_stat` failed.
    pub memory: Option<VmStat>,
}

/// Gather system information. Tools that are missing or fail leave their
/// field as `N/A` (or `None` for memory) rather than failing the whole call.
pub fn collect() -> SystemInfo {
    let system = match std::env::consts::OS {
        "macos" => "Darwin".to_string(),
        other => other.to_string(),
    };

    let version = capture("sw_vers", &["-productVersion"]).unwrap_or_else(|| "N/A".into());
    let processor = capture("sysctl", &["-n", "machdep.cpu.brand_string"])
        .unwrap_or_else(|| std::env::consts::ARCH.to_string());
    let memory = capture("vm_stat", &[]).map(|out| parse_vm_stat(&out));

    SystemInfo {
        system,
        version,
        processor,
        memory,
    }
}

/// `sw_vers -productVersion`, if available.
pub fn macos_version() -> Option<String> {
    capture("sw_vers", &["-productVersion"])
}

fn capture(tool: &str, args: &[&str]) -> Option<String> {
    match process::run(tool, args) {
        Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
        Ok(out) => {
            tracing::debug!(tool, code = out.code, "tool exited unsuccessfully");
            None
        }
        Err(e) => {
            tracing::debug!("{e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_stat_uses_header_page_size() {
        let out = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                               12345.
Pages active:                            200000.
\"Translation faults\":                  99.
";
        let vm = parse_vm_stat(out);
        assert_eq!(vm.page_size, 16384);
        assert_eq!(vm.stats.len(), 3);
        assert_eq!(vm.stats[0].name, "Pages free");
        assert_eq!(vm.stats[0].bytes, 12345 * 16384);
        assert_eq!(vm.stats[2].name, "Translation faults");
    }

    #[test]
    fn test_parse_vm_stat_default_page_size() {
        let vm = parse_vm_stat("Pages free: 10.\nbogus line\nPages wired down: x.\n");
        assert_eq!(vm.page_size, 4096);
        assert_eq!(vm.stats, vec![MemoryStat { name: "Pages free".into(), bytes: 40960 }]);
    }

    #[test]
    fn test_major_version() {
        assert_eq!(major_version("14.2.1"), Some(14));
        assert_eq!(major_version("11\n"), Some(11));
        assert_eq!(major_version(""), None);
    }
}
