//! `mactools ports` - list, kill and scan

use super::finish;
use crate::ui::{Output, Reported, progress, prompt, table};
use anyhow::{Result, bail};
use indicatif::ProgressBar;
use mactools_core::ports::{self, PortProcess, ScanResult, Signal};
use mactools_core::Config;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Port selection flags of `ports list`.
#[derive(Debug, Default)]
pub struct ListSelection {
    pub ports: Vec<u16>,
    pub web: bool,
    pub db: bool,
    pub dev: bool,
    pub mail: bool,
    pub groups: Vec<String>,
    pub all_common: bool,
}

impl ListSelection {
    fn group_names(&self) -> Vec<&str> {
        let builtin = [
            (self.web, "web"),
            (self.db, "db"),
            (self.dev, "dev"),
            (self.mail, "mail"),
        ];
        builtin
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .chain(self.groups.iter().map(String::as_str))
            .collect()
    }
}

/// Resolve the selection against the known groups.
fn resolve(selection: &ListSelection, config: &Config) -> Result<BTreeSet<u16>> {
    let groups = ports::port_groups(&config.ports.groups);
    let names = selection.group_names();
    if let Some(unknown) = names.iter().find(|n| !groups.contains_key(**n)) {
        let known: Vec<&str> = groups.keys().map(String::as_str).collect();
        bail!("Unknown port group '{unknown}' (known: {})", known.join(", "));
    }
    Ok(ports::select_ports(
        &selection.ports,
        &names,
        selection.all_common,
        &groups,
    ))
}

fn process_rows(processes: &[PortProcess]) -> impl Iterator<Item = Vec<String>> + '_ {
    processes.iter().map(|p| {
        vec![
            p.port.to_string(),
            p.command.clone(),
            p.pid.to_string(),
            p.user.clone(),
            p.protocol.clone(),
            p.name.clone(),
            p.state.clone(),
        ]
    })
}

const PROCESS_HEADERS: [&str; 7] = ["Port", "Command", "PID", "User", "Proto", "Name", "State"];

pub fn list(selection: &ListSelection, json: bool, config: &Config) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_list(selection, config, &out))
}

fn run_list(selection: &ListSelection, config: &Config, out: &Output) -> Result<()> {
    let selected = resolve(selection, config)?;
    tracing::debug!(count = selected.len(), "checking ports");

    let mut found: BTreeMap<u16, Vec<PortProcess>> = BTreeMap::new();
    for port in &selected {
        let processes = ports::processes_on_port(*port)?;
        if !processes.is_empty() {
            found.insert(*port, processes);
        }
    }

    if out.is_json() {
        return out.json(&serde_json::json!({
            "success": true,
            "checked": selected,
            "ports": found,
        }));
    }

    out.section(&format!("Checked {} port(s)", selected.len()));
    if found.is_empty() {
        out.info("No processes found on the selected ports");
        return Ok(());
    }
    let all: Vec<PortProcess> = found.into_values().flatten().collect();
    out.line(&table::build(&PROCESS_HEADERS, process_rows(&all)).to_string());
    Ok(())
}

#[derive(Debug, Serialize)]
struct KillOutcome {
    pid: u32,
    command: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// `ports kill` options.
#[derive(Debug)]
pub struct KillArgs {
    pub port: u16,
    pub force: bool,
    pub yes: bool,
    pub signal: Option<String>,
}

/// `--signal` wins; otherwise KILL with `--force`, TERM without.
fn choose_signal(args: &KillArgs) -> Result<Signal> {
    match &args.signal {
        Some(raw) => Ok(Signal::parse(raw)?),
        None if args.force => Ok(Signal::kill()),
        None => Ok(Signal::term()),
    }
}

pub fn kill(args: &KillArgs, json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_kill(args, &out))
}

fn run_kill(args: &KillArgs, out: &Output) -> Result<()> {
    let signal = choose_signal(args)?;
    let processes = ports::processes_on_port(args.port)?;
    let targets = ports::unique_pids(&processes);

    if targets.is_empty() {
        out.info(&format!("No process is using port {}", args.port));
        if out.is_json() {
            out.json(&serde_json::json!({
                "success": true,
                "port": args.port,
                "signal": signal.name,
                "processes": [],
            }))?;
        }
        return Ok(());
    }

    out.section(&format!("Processes on port {}", args.port));
    out.line(&table::build(&PROCESS_HEADERS, process_rows(&processes)).to_string());

    if !(args.yes || out.is_json())
        && !prompt::confirm(&format!(
            "Send SIG{} to {} process(es)?",
            signal.name,
            targets.len()
        ))?
    {
        out.warning("Cancelled.");
        return Ok(());
    }

    let outcomes: Vec<KillOutcome> = targets
        .into_iter()
        .map(|(pid, command)| match ports::send_signal(pid, &signal) {
            Ok(()) => {
                out.success(&format!("Sent SIG{} to {command} ({pid})", signal.name));
                KillOutcome {
                    pid,
                    command,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(pid, "signal failed: {e}");
                out.warning(&format!("Could not signal {command} ({pid}): {e}"));
                KillOutcome {
                    pid,
                    command,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    let any_ok = outcomes.iter().any(|o| o.success);
    if out.is_json() {
        out.json(&serde_json::json!({
            "success": any_ok,
            "port": args.port,
            "signal": signal.name,
            "processes": outcomes,
        }))?;
    }
    if any_ok { Ok(()) } else { Err(Reported.into()) }
}

/// `ports scan` options.
#[derive(Debug)]
pub struct ScanArgs {
    pub start: u32,
    pub end: u32,
    pub common: bool,
    pub open_only: bool,
    pub host: String,
    pub timeout: Option<f64>,
}

fn scan_timeout(args: &ScanArgs, config: &Config) -> Result<Duration> {
    match args.timeout {
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Duration::from_secs_f64(secs)),
        Some(secs) => bail!("Invalid timeout {secs}: must be a positive number of seconds"),
        None => Ok(Duration::from_millis(config.ports.scan_timeout_ms)),
    }
}

fn scan_ports(args: &ScanArgs, config: &Config) -> Result<BTreeSet<u16>> {
    let mut selected: BTreeSet<u16> = ports::validate_range(args.start, args.end)?.collect();
    if args.common {
        let groups = ports::port_groups(&config.ports.groups);
        selected.extend(ports::select_ports(&[], &[], true, &groups));
    }
    Ok(selected)
}

pub fn scan(args: &ScanArgs, json: bool, config: &Config) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_scan(args, config, &out))
}

fn run_scan(args: &ScanArgs, config: &Config, out: &Output) -> Result<()> {
    let timeout = scan_timeout(args, config)?;
    let selected = scan_ports(args, config)?;
    tracing::debug!(host = %args.host, count = selected.len(), ?timeout, "scanning");

    let bar = if out.is_json() {
        ProgressBar::hidden()
    } else {
        progress::bar(selected.len() as u64, "Scanning")
    };

    let mut results = Vec::with_capacity(selected.len());
    for port in &selected {
        bar.set_message(format!("{}:{port}", args.host));
        let open = ports::is_port_open(&args.host, *port, timeout);
        let processes = if open { owners(*port) } else { Vec::new() };
        results.push(ScanResult {
            port: *port,
            open,
            processes,
        });
        bar.inc(1);
    }
    bar.finish_and_clear();

    let open_ports: Vec<u16> = results.iter().filter(|r| r.open).map(|r| r.port).collect();
    let shown: Vec<&ScanResult> = results
        .iter()
        .filter(|r| r.open || !args.open_only)
        .collect();

    if out.is_json() {
        return out.json(&serde_json::json!({
            "success": true,
            "host": args.host,
            "scanned": selected.len(),
            "open": open_ports,
            "results": shown,
        }));
    }

    out.section(&format!(
        "{} of {} port(s) open on {}",
        open_ports.len(),
        selected.len(),
        args.host
    ));
    let rows = shown.iter().map(|r| {
        let owner = r
            .processes
            .first()
            .map(|p| format!("{} ({})", p.command, p.pid))
            .unwrap_or_default();
        vec![
            r.port.to_string(),
            if r.open { "open" } else { "closed" }.to_string(),
            owner,
        ]
    });
    if !shown.is_empty() {
        out.line(&table::build(&["Port", "Status", "Process"], rows).to_string());
    }
    Ok(())
}

/// lsof annotation for an open port; a failing lsof only costs the annotation.
fn owners(port: u16) -> Vec<PortProcess> {
    match ports::processes_on_port(port) {
        Ok(processes) => processes,
        Err(e) => {
            tracing::debug!(port, "lsof failed: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_names_from_flags() {
        let selection = ListSelection {
            web: true,
            mail: true,
            groups: vec!["infra".into()],
            ..ListSelection::default()
        };
        assert_eq!(selection.group_names(), vec!["web", "mail", "infra"]);
    }

    #[test]
    fn test_unknown_group_is_rejected() {
        let selection = ListSelection {
            groups: vec!["nope".into()],
            ..ListSelection::default()
        };
        let err = resolve(&selection, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("Unknown port group 'nope'"));
    }

    #[test]
    fn test_config_group_resolves() {
        let config = Config::parse("[ports.groups]\ninfra = [2375, 6443]\n").unwrap();
        let selection = ListSelection {
            groups: vec!["infra".into()],
            ..ListSelection::default()
        };
        let ports = resolve(&selection, &config).unwrap();
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![2375, 6443]);
    }

    #[test]
    fn test_signal_choice() {
        let mut args = KillArgs {
            port: 3000,
            force: false,
            yes: true,
            signal: None,
        };
        assert_eq!(choose_signal(&args).unwrap(), Signal::term());
        args.force = true;
        assert_eq!(choose_signal(&args).unwrap(), Signal::kill());
        args.signal = Some("HUP".into());
        assert_eq!(choose_signal(&args).unwrap().number, 1);
        args.signal = Some("NOPE".into());
        assert!(choose_signal(&args).is_err());
    }

    #[test]
    fn test_scan_timeout_validation() {
        let mut args = ScanArgs {
            start: 8000,
            end: 8001,
            common: false,
            open_only: false,
            host: "localhost".into(),
            timeout: None,
        };
        let config = Config::default();
        assert_eq!(scan_timeout(&args, &config).unwrap(), Duration::from_millis(500));
        args.timeout = Some(0.25);
        assert_eq!(scan_timeout(&args, &config).unwrap(), Duration::from_millis(250));
        args.timeout = Some(-1.0);
        assert!(scan_timeout(&args, &config).is_err());
    }

    #[test]
    fn test_scan_ports_with_common_groups() {
        let mut args = ScanArgs {
            start: 8000,
            end: 8002,
            common: true,
            open_only: false,
            host: "localhost".into(),
            timeout: None,
        };
        let selected = scan_ports(&args, &Config::default()).unwrap();
        assert!(selected.contains(&8001));
        assert!(selected.contains(&5432));

        args.start = 9000;
        args.end = 8000;
        assert!(scan_ports(&args, &Config::default()).is_err());
    }
}
