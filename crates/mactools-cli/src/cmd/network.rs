//! `mactools network` - interface/DNS/route info and DNS cache flush

use super::finish;
use crate::ui::{Output, prompt, table};
use anyhow::{Result, bail};
use mactools_core::network::{self, DnsInfo, Interface, Route};
use mactools_core::{ToolError, process, sysinfo};
use serde::Serialize;

/// Sections of `network info`.
#[derive(Debug, Clone, Copy)]
pub struct Sections {
    pub dns: bool,
    pub ip: bool,
    pub routes: bool,
}

impl Sections {
    /// Every section when none was asked for.
    fn resolved(self) -> Self {
        if self.dns || self.ip || self.routes {
            self
        } else {
            Self {
                dns: true,
                ip: true,
                routes: true,
            }
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct NetworkReport {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    interfaces: Option<Vec<Interface>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dns: Option<DnsInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    routes: Option<Vec<Route>>,
}

fn capture(tool: &str, args: &[&str]) -> Result<String, ToolError> {
    Ok(process::run(tool, args)?.check(tool)?.stdout)
}

pub fn info(interface: Option<&str>, sections: Sections, json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_info(interface, sections.resolved(), &out))
}

fn run_info(interface: Option<&str>, sections: Sections, out: &Output) -> Result<()> {
    let mut report = NetworkReport {
        success: true,
        ..NetworkReport::default()
    };

    if sections.ip {
        let mut interfaces = network::parse_ifconfig(&capture("ifconfig", &[])?);
        if let Some(name) = interface {
            interfaces.retain(|i| i.name == name);
            if interfaces.is_empty() {
                bail!("Interface '{name}' not found");
            }
        }
        report.interfaces = Some(interfaces);
    }
    if sections.dns {
        report.dns = Some(network::parse_scutil_dns(&capture("scutil", &["--dns"])?));
    }
    if sections.routes {
        let routes = network::parse_netstat_routes(&capture("netstat", &["-nr"])?);
        report.routes = Some(match interface {
            Some(name) => network::routes_for_interface(routes, name),
            None => routes,
        });
    }

    if out.is_json() {
        return out.json(&report);
    }
    render(out, &report);
    Ok(())
}

fn render(out: &Output, report: &NetworkReport) {
    if let Some(interfaces) = &report.interfaces {
        out.section("Interfaces");
        for iface in interfaces {
            let status = iface.status.as_deref().unwrap_or("unknown");
            out.line(&format!("  {} ({status})", iface.name));
            for addr in &iface.addresses {
                let label = if addr.kind == "ipv4" { "IPv4" } else { "IPv6" };
                out.detail(
                    &format!("  {label}"),
                    &format!("{} / {}", addr.address, addr.netmask),
                );
            }
        }
    }

    if let Some(dns) = &report.dns {
        out.section("DNS");
        let none = || "none".to_string();
        let servers = if dns.servers.is_empty() { none() } else { dns.servers.join(", ") };
        let domains = if dns.search_domains.is_empty() {
            none()
        } else {
            dns.search_domains.join(", ")
        };
        out.detail("Nameservers", &servers);
        out.detail("Search domains", &domains);
    }

    if let Some(routes) = &report.routes {
        out.section("Routes");
        if routes.is_empty() {
            out.info("No routes");
            return;
        }
        let columns = ["destination", "gateway", "flags", "netif"];
        let rows = routes.iter().map(|r| {
            columns
                .iter()
                .map(|c| r.get(*c).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        });
        out.line(&table::build(&["Destination", "Gateway", "Flags", "Interface"], rows).to_string());
    }
}

/// Commands that flush the resolver caches on `major` macOS.
pub fn flush_commands(major: Option<u32>) -> Vec<Vec<&'static str>> {
    let hup = vec!["killall", "-HUP", "mDNSResponder"];
    if major.is_some_and(|m| m >= 12) {
        vec![vec!["dscacheutil", "-flushcache"], hup]
    } else {
        vec![hup]
    }
}

pub fn dns_flush(force: bool, json: bool) -> Result<()> {
    let out = Output::new(json);
    finish(&out, run_dns_flush(force, &out))
}

fn run_dns_flush(force: bool, out: &Output) -> Result<()> {
    if std::env::consts::OS != "macos" {
        bail!("DNS flush is only supported on macOS");
    }
    if !(force || out.is_json()) && !prompt::confirm("Flush the DNS cache? This requires sudo.")? {
        out.warning("Cancelled.");
        return Ok(());
    }

    let version = sysinfo::macos_version();
    let major = version.as_deref().and_then(sysinfo::major_version);
    tracing::debug!(?version, "flushing DNS cache");

    for command in flush_commands(major) {
        let code = if out.is_json() {
            process::run("sudo", &command)?.code
        } else {
            process::run_inherited("sudo", &command)?
        };
        if code != 0 {
            bail!("sudo {} exited with {code}", command.join(" "));
        }
    }

    out.success("DNS cache flushed");
    if out.is_json() {
        out.json(&serde_json::json!({
            "success": true,
            "macos_version": version,
        }))?;
    }
    Ok(())
}
