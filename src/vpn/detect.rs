//! Interface and gateway detection over parsed `ip` output

use crate::platform::InterfaceRecord;
use crate::vpn::route::{AddressFamily, RouteRecord};
use ipnet::Ipv6Net;
use serde::Serialize;
use std::net::{IpAddr, Ipv6Addr};
use tracing::debug;

/// Longest prefix kept for auto-detected LAN networks
const LAN_PREFIX: u8 = 64;

/// Non-VPN IPv4 default route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultGateway {
    pub gateway: IpAddr,
    pub device: String,
}

/// Find the VPN tunnel interface.
///
/// The FXZ client binds several addresses to its tunnel, so the first
/// interface whose name contains `prefix` and that carries more than one
/// address is taken.
pub fn detect_vpn_interface(interfaces: &[InterfaceRecord], prefix: &str) -> Option<String> {
    let iface = interfaces
        .iter()
        .filter(|iface| iface.name.contains(prefix))
        .find(|iface| iface.addresses.len() > 1)?;
    debug!("Detected VPN interface {}", iface.name);
    Some(iface.name.clone())
}

/// Derive the LAN's IPv6 networks from the addresses bound to an interface.
///
/// Link-local and non-IPv6 addresses are ignored. A missing prefix length
/// is read as /64 and longer prefixes are widened to /64.
pub fn local_ipv6_networks(interfaces: &[InterfaceRecord]) -> Vec<Ipv6Net> {
    let mut networks = Vec::new();

    for addr in interfaces.iter().flat_map(|iface| &iface.addresses) {
        let Ok(IpAddr::V6(ip)) = addr.local.parse::<IpAddr>() else {
            continue;
        };
        if is_link_local(&ip) {
            continue;
        }

        let prefix = addr.prefix_len.unwrap_or(LAN_PREFIX).min(LAN_PREFIX);
        let Ok(net) = Ipv6Net::new(ip, prefix) else {
            continue;
        };
        let net = net.trunc();
        if !networks.contains(&net) {
            networks.push(net);
        }
    }

    networks
}

/// First IPv4 default route that does not leave through the VPN
pub fn default_gateway(routes: &[RouteRecord], vpn_interface: &str) -> Option<DefaultGateway> {
    routes
        .iter()
        .filter(|r| r.family == AddressFamily::V4)
        .filter(|r| r.destination == "default" && r.device != vpn_interface)
        .find_map(|r| match r.gateway {
            Some(gateway) if !r.device.is_empty() => Some(DefaultGateway {
                gateway,
                device: r.device.clone(),
            }),
            _ => None,
        })
}

// fe80::/10
fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
