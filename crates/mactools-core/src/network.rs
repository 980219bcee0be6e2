//! Parsers for `ifconfig`, `scutil --dns` and `netstat -nr` output.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One address line of an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    /// `ipv4` or `ipv6`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Address as printed, including any `%scope` suffix.
    pub address: String,
    /// Hex netmask for IPv4, prefix length for IPv6.
    pub netmask: String,
}

/// An `ifconfig` interface block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    /// e.g. `en0`.
    pub name: String,
    /// `active` / `inactive` when ifconfig prints a status line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// IPv4 and IPv6 addresses in print order.
    pub addresses: Vec<Address>,
}

/// Parse `ifconfig` output into interfaces, in the order they appear.
pub fn parse_ifconfig(output: &str) -> Vec<Interface> {
    let mut interfaces: Vec<Interface> = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            let name = line.split(':').next().unwrap_or(line).trim().to_string();
            interfaces.push(Interface {
                name,
                status: None,
                addresses: Vec::new(),
            });
            continue;
        }

        let Some(current) = interfaces.last_mut() else {
            continue;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["inet", addr, "netmask", mask, ..] => current.addresses.push(Address {
                kind: "ipv4".into(),
                address: (*addr).to_string(),
                netmask: (*mask).to_string(),
            }),
            ["inet6", addr, "prefixlen", len, ..] => current.addresses.push(Address {
                kind: "ipv6".into(),
                address: (*addr).to_string(),
                netmask: (*len).to_string(),
            }),
            ["status:", rest @ ..] => current.status = Some(rest.join(" ")),
            _ => {}
        }
    }

    interfaces
}

/// Resolver configuration from `scutil --dns`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DnsInfo {
    /// Nameserver addresses.
    pub servers: Vec<String>,
    /// Search domains.
    pub search_domains: Vec<String>,
}

/// Parse `scutil --dns`. Servers and domains are de-duplicated and sorted.
pub fn parse_scutil_dns(output: &str) -> DnsInfo {
    let mut servers = BTreeSet::new();
    let mut domains = BTreeSet::new();

    for line in output.lines() {
        let trimmed = line.trim_start();
        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if key.starts_with("nameserver[") {
            servers.insert(value.to_string());
        } else if key.starts_with("search domain[") {
            domains.insert(value.to_string());
        }
    }

    DnsInfo {
        servers: servers.into_iter().collect(),
        search_domains: domains.into_iter().collect(),
    }
}

/// One routing table row keyed by lower-cased column header.
pub type Route = BTreeMap<String, String>;

/// Parse `netstat -nr`. Each `Destination ...` header line starts a new
/// table; rows take the columns they have, so a missing trailing `Expire`
/// simply leaves that key out.
pub fn parse_netstat_routes(output: &str) -> Vec<Route> {
    let mut headers: Option<Vec<String>> = None;
    let mut routes = Vec::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.first() == Some(&"Destination") {
            headers = Some(parts.iter().map(|h| h.to_lowercase()).collect());
            continue;
        }
        let Some(headers) = headers.as_ref() else {
            continue;
        };
        if parts.len() < 2 {
            continue;
        }
        routes.push(
            headers
                .iter()
                .zip(parts)
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
    }

    routes
}

/// Keep only routes whose `netif` column is `interface`.
pub fn routes_for_interface(routes: Vec<Route>, interface: &str) -> Vec<Route> {
    routes
        .into_iter()
        .filter(|r| r.get("netif").is_some_and(|n| n == interface))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFCONFIG: &str = "\
lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384
\toptions=1203<RXCSUM,TXCSUM,TXSTATUS,SW_TIMESTAMP>
\tinet 127.0.0.1 netmask 0xff000000
\tinet6 ::1 prefixlen 128
\tinet6 fe80::1%lo0 prefixlen 64 scopeid 0x1
en0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tether a4:83:e7:00:00:01
\tinet 192.168.1.23 netmask 0xffffff00 broadcast 192.168.1.255
\tmedia: autoselect
\tstatus: active
utun0: flags=8051<UP,POINTOPOINT,RUNNING,MULTICAST> mtu 1380
";

    #[test]
    fn test_parse_ifconfig() {
        let ifaces = parse_ifconfig(IFCONFIG);
        let names: Vec<_> = ifaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["lo0", "en0", "utun0"]);

        let lo = &ifaces[0];
        assert_eq!(lo.addresses.len(), 3);
        assert_eq!(lo.addresses[0].kind, "ipv4");
        assert_eq!(lo.addresses[0].netmask, "0xff000000");
        assert_eq!(lo.addresses[2].address, "fe80::1%lo0");
        assert_eq!(lo.addresses[2].netmask, "64");
        assert_eq!(lo.status, None);

        let en0 = &ifaces[1];
        assert_eq!(en0.status.as_deref(), Some("active"));
        assert_eq!(en0.addresses[0].address, "192.168.1.23");

        assert!(ifaces[2].addresses.is_empty());
    }

    #[test]
    fn test_parse_scutil_dns() {
        let out = "\
DNS configuration

resolver #1
  search domain[0] : lan
  search domain[1] : corp.example.com
  nameserver[0] : 192.168.1.1
  nameserver[1] : 1.1.1.1
  if_index : 6 (en0)

resolver #2
  domain   : local
  nameserver[0] : 192.168.1.1
  search domain[0] : lan
";
        let dns = parse_scutil_dns(out);
        assert_eq!(dns.servers, vec!["1.1.1.1", "192.168.1.1"]);
        assert_eq!(dns.search_domains, vec!["corp.example.com", "lan"]);
    }

    #[test]
    fn test_parse_scutil_ipv6_server_keeps_colons() {
        let dns = parse_scutil_dns("  nameserver[0] : fe80::1%en0\n");
        assert_eq!(dns.servers, vec!["fe80::1%en0"]);
    }

    #[test]
    fn test_parse_netstat_routes() {
        let out = "\
Routing tables

Internet:
Destination        Gateway            Flags               Netif Expire
default            192.168.1.1        UGScg                 en0
127                127.0.0.1          UCS                   lo0
192.168.1.1/32     link#6             UCS                   en0      !

Internet6:
Destination                             Gateway                                 Flags               Netif Expire
default                                 fe80::%utun0                            UGcIg               utun0
";
        let routes = parse_netstat_routes(out);
        assert_eq!(routes.len(), 4);
        assert_eq!(routes[0]["destination"], "default");
        assert_eq!(routes[0]["gateway"], "192.168.1.1");
        assert_eq!(routes[0]["netif"], "en0");
        assert!(!routes[0].contains_key("expire"));
        assert_eq!(routes[2]["expire"], "!");

        let en0 = routes_for_interface(routes, "en0");
        assert_eq!(en0.len(), 2);
    }
}
