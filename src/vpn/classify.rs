//! Route coverage classification
//!
//! Given a routing table snapshot and the VPN interface name, work out which
//! tunnel routes capture local address space (and must be deleted) and which
//! configured local networks have no specific tunnel route at all.
//!
//! Classification is pure: it never touches the OS and holds no state
//! between calls.

use crate::vpn::route::{AddressFamily, Destination, RouteRecord};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::Serialize;
use std::collections::HashSet;

/// True for the IPv6 half-default routes (`::/1` and `8000::/1`) that some
/// VPN clients install in place of a default route, even with IPv6 disabled.
///
/// Expects a truncated network, where a /1 can only be one of the two halves.
pub fn is_half_default(net: &Ipv6Net) -> bool {
    net.prefix_len() == 1
}

/// Address ranges the VPN should not be intercepting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalNetworks {
    pub v4: Vec<Ipv4Net>,
    pub v6: Vec<Ipv6Net>,
}

impl LocalNetworks {
    pub fn new(v4: Vec<Ipv4Net>, v6: Vec<Ipv6Net>) -> Self {
        Self { v4, v6 }
    }

    /// True if `net` is a subnet of (or equal to) any entry of its own family
    pub fn contains(&self, net: &IpNet) -> bool {
        match net {
            IpNet::V4(net) => self.v4.iter().any(|local| local.contains(net)),
            IpNet::V6(net) => self.v6.iter().any(|local| local.contains(net)),
        }
    }
}

/// Result of one classification pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Routes to delete, in routing-table order, without duplicates
    pub to_delete: Vec<RouteRecord>,
    /// Tunnel routes whose destination lies inside a local network
    pub local_matches: Vec<RouteRecord>,
    /// Tunnel routes that are exactly one of the IPv6 half-defaults
    pub half_defaults: Vec<RouteRecord>,
    /// Local IPv4 networks with no tunnel route inside them
    pub uncovered_v4: Vec<Ipv4Net>,
    /// Local IPv6 networks with no tunnel route inside them
    pub uncovered_v6: Vec<Ipv6Net>,
    /// Number of routes through the VPN interface
    pub vpn_routes: usize,
    /// Tunnel routes whose destination could not be read as a network
    pub skipped: usize,
}

impl Classification {
    /// Local matches of a single address family
    pub fn local_count(&self, family: AddressFamily) -> usize {
        self.local_matches
            .iter()
            .filter(|route| route.family == family)
            .count()
    }
}

/// Classify `routes` against the local networks for `vpn_interface`.
///
/// Only routes whose device is `vpn_interface` are considered. Unparseable
/// destinations are counted in [`Classification::skipped`] and otherwise
/// ignored; an empty table or a missing interface yields an empty result
/// with every local network uncovered.
pub fn classify(
    routes: &[RouteRecord],
    vpn_interface: &str,
    local: &LocalNetworks,
) -> Classification {
    let mut result = Classification::default();
    let mut covered_v4 = vec![false; local.v4.len()];
    let mut covered_v6 = vec![false; local.v6.len()];
    let mut seen: HashSet<(AddressFamily, &str)> = HashSet::new();

    for route in routes.iter().filter(|r| r.device == vpn_interface) {
        result.vpn_routes += 1;

        let net = match route.parse_destination() {
            Destination::Network(net) => net,
            Destination::Unparseable => {
                result.skipped += 1;
                continue;
            }
        };

        match &net {
            IpNet::V4(v4) => {
                let hits = local.v4.iter().map(|l| l.contains(v4));
                mark_covered(&mut covered_v4, hits);
            }
            IpNet::V6(v6) => {
                let hits = local.v6.iter().map(|l| l.contains(v6));
                mark_covered(&mut covered_v6, hits);
            }
        }

        let is_local = local.contains(&net);
        let half_default = match net {
            IpNet::V6(net) => route.family == AddressFamily::V6 && is_half_default(&net),
            IpNet::V4(_) => false,
        };

        if is_local {
            result.local_matches.push(route.clone());
        }
        if half_default {
            result.half_defaults.push(route.clone());
        }
        let key = (route.family, route.destination.as_str());
        if (is_local || half_default) && seen.insert(key) {
            result.to_delete.push(route.clone());
        }
    }

    result.uncovered_v4 = uncovered(&local.v4, &covered_v4);
    result.uncovered_v6 = uncovered(&local.v6, &covered_v6);
    result
}

fn mark_covered(covered: &mut [bool], hits: impl Iterator<Item = bool>) {
    for (flag, hit) in covered.iter_mut().zip(hits) {
        *flag |= hit;
    }
}

fn uncovered<N: Copy>(networks: &[N], covered: &[bool]) -> Vec<N> {
    networks
        .iter()
        .zip(covered)
        .filter(|(_, covered)| !**covered)
        .map(|(net, _)| *net)
        .collect()
}
