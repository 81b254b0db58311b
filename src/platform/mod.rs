//! Platform network information (routing tables and interface addresses)

pub mod iproute;

pub use iproute::IpCommand;

use crate::vpn::route::{AddressFamily, RouteRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to run {command}: {message}")]
    CommandFailed { command: String, message: String },
    #[error("Failed to parse output of {command}: {source}")]
    Parse {
        command: String,
        source: serde_json::Error,
    },
}

/// An interface and the addresses bound to it, as reported by `ip -j addr`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    #[serde(rename = "ifname")]
    pub name: String,
    #[serde(rename = "addr_info", default)]
    pub addresses: Vec<InterfaceAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceAddress {
    #[serde(default)]
    pub local: String,
    #[serde(rename = "prefixlen", default)]
    pub prefix_len: Option<u8>,
}

/// Source of routing-table and interface snapshots
pub trait NetworkSource {
    /// Routing table entries of one address family
    fn routing_table(&self, family: AddressFamily) -> Result<Vec<RouteRecord>, PlatformError>;

    /// Interfaces with their addresses, optionally narrowed to one interface
    /// and one address family
    fn interfaces(
        &self,
        name: Option<&str>,
        family: Option<AddressFamily>,
    ) -> Result<Vec<InterfaceRecord>, PlatformError>;
}

/// Default `ip` binary: iproute2mac from Homebrew on macOS, `ip` elsewhere
pub fn default_ip_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "/opt/homebrew/bin/ip"
    } else {
        "ip"
    }
}
