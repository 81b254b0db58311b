//! Fix-mode command generation
//!
//! Commands are emitted as `ip` invocations for the user to review and run;
//! nothing here touches the routing table.

use crate::vpn::classify::Classification;
use crate::vpn::detect::DefaultGateway;
use crate::vpn::route::AddressFamily;
use ipnet::Ipv4Net;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// A single `ip route` command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RouteCommand {
    /// Drop a route installed through the tunnel
    Delete {
        destination: String,
        family: AddressFamily,
        device: String,
    },
    /// Send a LAN network back through the regular gateway
    Add {
        network: Ipv4Net,
        gateway: IpAddr,
        device: String,
    },
}

impl fmt::Display for RouteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteCommand::Delete {
                destination,
                family: AddressFamily::V4,
                device,
            } => write!(f, "ip route del {} dev {}", destination, device),
            RouteCommand::Delete {
                destination,
                family: AddressFamily::V6,
                device,
            } => write!(f, "ip -6 route del {} dev {}", destination, device),
            RouteCommand::Add {
                network,
                gateway,
                device,
            } => write!(f, "ip route add {} via {} dev {}", network, gateway, device),
        }
    }
}

/// Build the fix commands: every deletion first, then one addition per
/// gateway network.
///
/// Additions are emitted for every gateway network whether or not it is
/// currently covered; ones that already exist fail harmlessly when run.
/// Without a non-VPN default gateway no additions are produced.
pub fn fix_commands(
    classification: &Classification,
    vpn_interface: &str,
    gateway_networks: &[Ipv4Net],
    gateway: Option<&DefaultGateway>,
) -> Vec<RouteCommand> {
    let mut commands: Vec<RouteCommand> = classification
        .to_delete
        .iter()
        .map(|route| RouteCommand::Delete {
            destination: route.display_destination().to_string(),
            family: route.family,
            device: vpn_interface.to_string(),
        })
        .collect();

    if let Some(gw) = gateway {
        for network in gateway_networks {
            commands.push(RouteCommand::Add {
                network: *network,
                gateway: gw.gateway,
                device: gw.device.clone(),
            });
        }
    }

    commands
}
