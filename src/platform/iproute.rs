//! `ip` (iproute2 / iproute2mac) backed network source

use super::{InterfaceRecord, NetworkSource, PlatformError};
use crate::vpn::route::{AddressFamily, RouteRecord};
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

/// One element of `ip -j route` output
#[derive(Debug, Deserialize)]
struct IpRouteEntry {
    #[serde(default)]
    dst: Option<String>,
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    dev: Option<String>,
}

pub struct IpCommand {
    binary: String,
}

impl IpCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, PlatformError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| PlatformError::CommandFailed {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlatformError::CommandFailed {
                command,
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for IpCommand {
    fn default() -> Self {
        Self::new(super::default_ip_command())
    }
}

impl NetworkSource for IpCommand {
    fn routing_table(&self, family: AddressFamily) -> Result<Vec<RouteRecord>, PlatformError> {
        let args = ["-j", family.ip_flag(), "route"];
        let out = self.run(&args)?;
        parse_routes(&out, family).map_err(|source| PlatformError::Parse {
            command: format!("{} {}", self.binary, args.join(" ")),
            source,
        })
    }

    fn interfaces(
        &self,
        name: Option<&str>,
        family: Option<AddressFamily>,
    ) -> Result<Vec<InterfaceRecord>, PlatformError> {
        let mut args = vec!["-j"];
        if let Some(family) = family {
            args.push(family.ip_flag());
        }
        args.push("addr");
        if let Some(name) = name {
            args.extend(["show", name]);
        }

        let out = self.run(&args)?;
        parse_interfaces(&out).map_err(|source| PlatformError::Parse {
            command: format!("{} {}", self.binary, args.join(" ")),
            source,
        })
    }
}

/// Parse `ip -j route` output into route records of `family`.
///
/// Entries without a destination keep an empty one, which never matches a
/// network or the default route. An unreadable gateway is dropped rather
/// than failing the whole table.
pub fn parse_routes(
    json: &str,
    family: AddressFamily,
) -> Result<Vec<RouteRecord>, serde_json::Error> {
    let entries: Vec<IpRouteEntry> = serde_json::from_str(json)?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let dst = entry.dst.unwrap_or_default();
            let dev = entry.dev.unwrap_or_default();
            let route = RouteRecord::new(dst, dev, family);
            match entry.gateway.and_then(|gw| gw.parse().ok()) {
                Some(gateway) => route.with_gateway(gateway),
                None => route,
            }
        })
        .collect())
}

/// Parse `ip -j addr` output
pub fn parse_interfaces(json: &str) -> Result<Vec<InterfaceRecord>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}
