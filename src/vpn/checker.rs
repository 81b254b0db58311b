//! Check/fix run over a live network source
//!
//! 1. Resolve the VPN interface (explicit override or auto-detection)
//! 2. Collect the IPv4 and IPv6 routing tables
//! 3. Detect the LAN's IPv6 networks
//! 4. Classify tunnel routes against the local networks
//! 5. In fix mode, turn the classification into `ip route` commands
//!
//! # Error Handling
//!
//! Only a missing VPN interface and failures reading the routing tables are
//! fatal. IPv6 network detection is best-effort: if it fails, no IPv6
//! networks are treated as local.

use crate::config::Config;
use crate::platform::{NetworkSource, PlatformError};
use crate::vpn::classify::{Classification, LocalNetworks, classify};
use crate::vpn::detect::{
    DefaultGateway, default_gateway, detect_vpn_interface, local_ipv6_networks,
};
use crate::vpn::remediation::{RouteCommand, fix_commands};
use crate::vpn::route::AddressFamily;
use ipnet::Ipv6Net;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("No FXZ interface found")]
    InterfaceNotFound,
    #[error("Platform error: {0}")]
    PlatformError(#[from] PlatformError),
}

/// What a run should do
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Produce fix commands instead of a summary
    pub fix: bool,
    /// Use this interface instead of auto-detecting one
    pub interface: Option<String>,
}

/// Outcome of a check/fix run
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub interface: String,
    pub local_networks: LocalNetworks,
    pub classification: Classification,
    /// Present in fix mode only
    pub gateway: Option<DefaultGateway>,
    /// Empty unless running in fix mode
    pub commands: Vec<RouteCommand>,
}

impl CheckReport {
    /// Human-readable check-mode summary
    pub fn summary_lines(&self) -> Vec<String> {
        let c = &self.classification;
        let mut lines = vec![format!(
            "{} Dst Found (IPv4: {}, IPv6: {})",
            c.local_matches.len(),
            c.local_count(AddressFamily::V4),
            c.local_count(AddressFamily::V6)
        )];

        if !c.half_defaults.is_empty() {
            lines.push(format!(
                "IPv6 half-default routes via FXZ: {} (use --fix to remove)",
                c.half_defaults.len()
            ));
        }

        lines
    }

    /// Lines to print on stdout for this run
    pub fn output_lines(&self, options: &CheckOptions) -> Vec<String> {
        if options.fix {
            self.commands.iter().map(ToString::to_string).collect()
        } else {
            self.summary_lines()
        }
    }
}

/// Run a check (or fix) against `source` using `config`
pub fn run_check<S: NetworkSource + ?Sized>(
    source: &S,
    config: &Config,
    options: &CheckOptions,
) -> Result<CheckReport, CheckError> {
    let interface = match &options.interface {
        Some(name) => name.clone(),
        None => {
            let interfaces = source.interfaces(None, None)?;
            detect_vpn_interface(&interfaces, &config.detect.tunnel_prefix)
                .ok_or(CheckError::InterfaceNotFound)?
        }
    };
    debug!("FXZ interface = {}", interface);

    let detected_v6 = detect_local_v6(source, config);
    let local = config.networks.local_networks(&detected_v6);
    let local_v4: Vec<String> = local.v4.iter().map(ToString::to_string).collect();
    let local_v6: Vec<String> = local.v6.iter().map(ToString::to_string).collect();
    debug!("Local IPv4 networks = {:?}", local_v4);
    debug!("Local IPv6 networks = {:?}", local_v6);

    let routes_v4 = source.routing_table(AddressFamily::V4)?;
    let routes_v6 = source.routing_table(AddressFamily::V6)?;
    let routes: Vec<_> = routes_v4.iter().chain(&routes_v6).cloned().collect();

    let classification = classify(&routes, &interface, &local);
    debug!("FXZ routes total: {}", classification.vpn_routes);
    debug!("Local routes: {}", classification.local_matches.len());
    for route in &classification.local_matches {
        debug!("  {:?}", route);
    }
    if classification.skipped > 0 {
        debug!("Skipped {} unparseable routes", classification.skipped);
    }

    let uncovered_gateway: Vec<String> = classification
        .uncovered_v4
        .iter()
        .filter(|net| config.networks.gateway_v4.contains(net))
        .map(ToString::to_string)
        .collect();
    if !uncovered_gateway.is_empty() {
        debug!(
            "Uncovered IPv4 networks (need route add): {:?}",
            uncovered_gateway
        );
    }

    let uncovered_v6: Vec<String> = classification
        .uncovered_v6
        .iter()
        .map(ToString::to_string)
        .collect();
    if !uncovered_v6.is_empty() {
        debug!(
            "Uncovered IPv6 networks (need route add): {:?}",
            uncovered_v6
        );
    }

    let (gateway, commands) = if options.fix {
        let gateway = default_gateway(&routes_v4, &interface);
        match &gateway {
            Some(gw) => info!("Default gateway: {} via {}", gw.gateway, gw.device),
            None => warn!(
                "No default gateway outside {}, skipping route additions",
                interface
            ),
        }
        let commands = fix_commands(
            &classification,
            &interface,
            &config.networks.gateway_v4,
            gateway.as_ref(),
        );
        (gateway, commands)
    } else {
        (None, Vec::new())
    };

    Ok(CheckReport {
        interface,
        local_networks: local,
        classification,
        gateway,
        commands,
    })
}

fn detect_local_v6<S: NetworkSource + ?Sized>(source: &S, config: &Config) -> Vec<Ipv6Net> {
    let Some(name) = config.detect.ipv6_interface() else {
        return Vec::new();
    };

    match source.interfaces(Some(name), Some(AddressFamily::V6)) {
        Ok(interfaces) => local_ipv6_networks(&interfaces),
        Err(e) => {
            warn!(
                "Failed to read IPv6 addresses of {}: {} (continuing)",
                name, e
            );
            Vec::new()
        }
    }
}
