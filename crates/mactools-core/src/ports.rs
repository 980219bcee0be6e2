//! Port inspection: `lsof` parsing, signal delivery and TCP probing.

use crate::error::{PortError, ToolError};
use crate::process;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Built-in port groups, selectable by name.
pub const BUILTIN_GROUPS: &[(&str, &[u16])] = &[
    ("web", &[80, 443, 3000, 8000, 8080, 8888]),
    ("db", &[3306, 5432, 27017, 6379, 5672, 9200]),
    ("dev", &[3000, 3001, 4200, 5000, 8000, 8080, 9000]),
    ("mail", &[25, 465, 587, 993, 995]),
];

/// Built-in groups with `extra` layered on top (same name replaces).
pub fn port_groups(extra: &BTreeMap<String, Vec<u16>>) -> BTreeMap<String, Vec<u16>> {
    let mut groups: BTreeMap<String, Vec<u16>> = BUILTIN_GROUPS
        .iter()
        .map(|(name, ports)| ((*name).to_string(), ports.to_vec()))
        .collect();
    for (name, ports) in extra {
        groups.insert(name.clone(), ports.clone());
    }
    groups
}

/// Union of explicit ports and the named groups. When nothing at all is
/// selected, every group is used.
pub fn select_ports(
    explicit: &[u16],
    selected_groups: &[&str],
    all_groups: bool,
    groups: &BTreeMap<String, Vec<u16>>,
) -> BTreeSet<u16> {
    let mut ports: BTreeSet<u16> = explicit.iter().copied().collect();
    let use_all = all_groups || (explicit.is_empty() && selected_groups.is_empty());

    for (name, members) in groups {
        if use_all || selected_groups.contains(&name.as_str()) {
            ports.extend(members);
        }
    }
    ports
}

/// One row of `lsof -i :PORT` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortProcess {
    /// COMMAND column, possibly truncated by lsof.
    pub command: String,
    /// PID column.
    pub pid: u32,
    /// USER column.
    pub user: String,
    /// FD column, e.g. `23u`.
    pub fd: String,
    /// TYPE column, `IPv4` or `IPv6`.
    #[serde(rename = "type")]
    pub kind: String,
    /// NODE column, `TCP` or `UDP`.
    pub protocol: String,
    /// NAME column without the trailing state.
    pub name: String,
    /// Trailing `(STATE)`, or `UNKNOWN`.
    pub state: String,
    /// Port that was queried.
    pub port: u16,
}

/// Parse `lsof -i :PORT -n -P` output. Malformed rows are skipped.
///
/// ```text
/// COMMAND   PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
/// node    12345  dev   23u  IPv4 0x1234      0t0  TCP *:3000 (LISTEN)
/// ```
pub fn parse_lsof(output: &str, port: u16) -> Vec<PortProcess> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 9 {
                return None;
            }
            let pid = parts[1].parse().ok()?;
            let state = parts
                .get(9)
                .map(|s| s.trim_start_matches('(').trim_end_matches(')'))
                .filter(|s| !s.is_empty())
                .unwrap_or("UNKNOWN");
            Some(PortProcess {
                command: parts[0].to_string(),
                pid,
                user: parts[2].to_string(),
                fd: parts[3].to_string(),
                kind: parts[4].to_string(),
                protocol: parts[7].to_string(),
                name: parts[8].to_string(),
                state: state.to_string(),
                port,
            })
        })
        .collect()
}

/// Processes holding `port`. `lsof` exits 1 when it finds nothing, which is
/// reported as an empty list.
///
/// # Errors
///
/// Returns [`ToolError`] if `lsof` cannot be run.
pub fn processes_on_port(port: u16) -> Result<Vec<PortProcess>, ToolError> {
    let spec = format!(":{port}");
    let out = process::run("lsof", ["-i", spec.as_str(), "-n", "-P"])?;
    if !out.success() {
        return Ok(Vec::new());
    }
    Ok(parse_lsof(&out.stdout, port))
}

/// Distinct `(pid, command)` pairs, first occurrence wins.
pub fn unique_pids(processes: &[PortProcess]) -> Vec<(u32, String)> {
    let mut seen = BTreeSet::new();
    processes
        .iter()
        .filter(|p| seen.insert(p.pid))
        .map(|p| (p.pid, p.command.clone()))
        .collect()
}

/// A resolved signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Name without the `SIG` prefix, or the number when it has no name.
    pub name: String,
    /// Darwin signal number.
    pub number: i32,
}

// Darwin numbering.
const SIGNALS: &[(&str, i32)] = &[
    ("HUP", 1),
    ("INT", 2),
    ("QUIT", 3),
    ("ABRT", 6),
    ("KILL", 9),
    ("USR1", 30),
    ("USR2", 31),
    ("ALRM", 14),
    ("TERM", 15),
    ("STOP", 17),
    ("TSTP", 18),
    ("CONT", 19),
];

impl Signal {
    /// Accepts `TERM`, `SIGTERM`, `term` or a number such as `15`.
    ///
    /// # Errors
    ///
    /// [`PortError::UnknownSignal`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, PortError> {
        let trimmed = raw.trim();
        if let Ok(number) = trimmed.parse::<i32>() {
            if number <= 0 {
                return Err(PortError::UnknownSignal(raw.to_string()));
            }
            let name = SIGNALS
                .iter()
                .find(|(_, n)| *n == number)
                .map_or_else(|| number.to_string(), |(name, _)| (*name).to_string());
            return Ok(Self { name, number });
        }

        let upper = trimmed.to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        SIGNALS
            .iter()
            .find(|(name, _)| *name == bare)
            .map(|(name, number)| Self {
                name: (*name).to_string(),
                number: *number,
            })
            .ok_or_else(|| PortError::UnknownSignal(raw.to_string()))
    }

    /// `SIGTERM`.
    pub fn term() -> Self {
        Self {
            name: "TERM".into(),
            number: 15,
        }
    }

    /// `SIGKILL`.
    pub fn kill() -> Self {
        Self {
            name: "KILL".into(),
            number: 9,
        }
    }
}

/// Send `signal` to `pid` with `kill -<n> <pid>`.
///
/// # Errors
///
/// [`ToolError::Failed`] when `kill` exits non-zero (no such process,
/// permission denied, ...).
pub fn send_signal(pid: u32, signal: &Signal) -> Result<(), ToolError> {
    let flag = format!("-{}", signal.number);
    let pid = pid.to_string();
    process::run("kill", [flag.as_str(), pid.as_str()])?.check("kill")?;
    Ok(())
}

/// Validate a scan range.
///
/// # Errors
///
/// [`PortError::InvalidRange`] unless `1 <= start <= end <= 65535`.
pub fn validate_range(start: u32, end: u32) -> Result<RangeInclusive<u16>, PortError> {
    let invalid = || PortError::InvalidRange { start, end };
    if start < 1 || start > end {
        return Err(invalid());
    }
    let start = u16::try_from(start).map_err(|_| invalid())?;
    let end = u16::try_from(end).map_err(|_| invalid())?;
    Ok(start..=end)
}

/// Whether a TCP connection to `host:port` succeeds within `timeout`.
/// Every resolved address is tried; resolution failure counts as closed.
pub fn is_port_open(host: &str, port: u16, timeout: Duration) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

/// Result of probing one port.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Probed port.
    pub port: u16,
    /// A TCP connect succeeded within the timeout.
    pub open: bool,
    /// Owners reported by lsof; empty for closed ports.
    pub processes: Vec<PortProcess>,
}
