//! Routing table records as seen through `ip -j route`

use ipnet::IpNet;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

/// Address family of a routing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Flag passed to `ip` to select this family
    pub fn ip_flag(self) -> &'static str {
        match self {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Outcome of interpreting a route destination as a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// A valid network; bare addresses become host networks
    Network(IpNet),
    /// Not an address or CIDR (e.g. `default`), excluded from matching
    Unparseable,
}

impl Destination {
    /// Parse a destination as an address (implicit host mask) or a CIDR.
    ///
    /// Host bits in a CIDR are cleared, so `192.168.1.7/24` is read as
    /// `192.168.1.0/24`.
    pub fn parse(dst: &str) -> Self {
        if dst.contains('/') {
            match dst.parse::<IpNet>() {
                Ok(net) => Destination::Network(net.trunc()),
                Err(_) => Destination::Unparseable,
            }
        } else {
            match dst.parse::<IpAddr>() {
                Ok(addr) => Destination::Network(IpNet::from(addr)),
                Err(_) => Destination::Unparseable,
            }
        }
    }
}

/// One entry of the OS routing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteRecord {
    /// Destination as reported by the OS (`default`, an address, or a CIDR)
    pub destination: String,
    /// Next hop, if the route has one
    pub gateway: Option<IpAddr>,
    /// Egress interface name
    pub device: String,
    pub family: AddressFamily,
}

impl RouteRecord {
    pub fn new(
        destination: impl Into<String>,
        device: impl Into<String>,
        family: AddressFamily,
    ) -> Self {
        Self {
            destination: destination.into(),
            gateway: None,
            device: device.into(),
            family,
        }
    }

    pub fn with_gateway(mut self, gateway: IpAddr) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn parse_destination(&self) -> Destination {
        Destination::parse(&self.destination)
    }

    /// Destination with the host suffix (`/32` or `/128`) removed
    pub fn display_destination(&self) -> &str {
        let suffix = match self.family {
            AddressFamily::V4 => "/32",
            AddressFamily::V6 => "/128",
        };
        self.destination
            .strip_suffix(suffix)
            .unwrap_or(&self.destination)
    }
}
