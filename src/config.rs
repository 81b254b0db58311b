//! Configuration handling for check-fxz

use crate::vpn::classify::LocalNetworks;
use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "check-fxz.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("No local IPv4 networks configured")]
    NoLocalNetworks,
    #[error("Local networks {0} and {1} overlap")]
    OverlappingNetworks(Ipv4Net, Ipv4Net),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub networks: NetworksConfig,
    #[serde(default)]
    pub detect: DetectConfig,
}

/// Local network lists.
///
/// Entries are parsed strictly: one invalid CIDR fails the whole config
/// load instead of being skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworksConfig {
    /// LAN networks reached through the default gateway (deleted and re-added)
    #[serde(default = "default_gateway_v4")]
    pub gateway_v4: Vec<Ipv4Net>,
    /// Directly connected networks (deleted only)
    #[serde(default = "default_direct_v4")]
    pub direct_v4: Vec<Ipv4Net>,
    /// IPv6 networks treated as local in addition to the detected ones
    #[serde(default)]
    pub extra_v6: Vec<Ipv6Net>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Path to the `ip` binary
    #[serde(default = "default_ip_command")]
    pub ip_command: String,
    /// Substring identifying tunnel interfaces
    #[serde(default = "default_tunnel_prefix")]
    pub tunnel_prefix: String,
    /// LAN interface whose IPv6 networks are treated as local; empty
    /// disables detection
    #[serde(default = "default_ipv6_interface")]
    pub ipv6_interface: String,
}

fn default_gateway_v4() -> Vec<Ipv4Net> {
    ["192.168.1.0/24", "192.168.2.0/24", "192.168.3.0/24"]
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn default_direct_v4() -> Vec<Ipv4Net> {
    "10.211.55.0/24".parse().into_iter().collect()
}

fn default_ip_command() -> String {
    crate::platform::default_ip_command().to_string()
}

fn default_tunnel_prefix() -> String {
    "utun".to_string()
}

fn default_ipv6_interface() -> String {
    "en0".to_string()
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            gateway_v4: default_gateway_v4(),
            direct_v4: default_direct_v4(),
            extra_v6: Vec::new(),
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            ip_command: default_ip_command(),
            tunnel_prefix: default_tunnel_prefix(),
            ipv6_interface: default_ipv6_interface(),
        }
    }
}

impl DetectConfig {
    pub fn ipv6_interface(&self) -> Option<&str> {
        Some(self.ipv6_interface.as_str()).filter(|name| !name.is_empty())
    }
}

impl NetworksConfig {
    /// Gateway networks followed by directly connected ones
    pub fn local_v4(&self) -> Vec<Ipv4Net> {
        self.gateway_v4
            .iter()
            .chain(&self.direct_v4)
            .copied()
            .collect()
    }

    /// Local networks for classification, with `detected_v6` ahead of the
    /// configured extras
    pub fn local_networks(&self, detected_v6: &[Ipv6Net]) -> LocalNetworks {
        let mut v6 = detected_v6.to_vec();
        for net in &self.extra_v6 {
            if !v6.contains(net) {
                v6.push(*net);
            }
        }
        LocalNetworks::new(self.local_v4(), v6)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` if given, else from the default locations, else
    /// fall back to built-in defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            debug!("Loading config from {}", path.display());
            return Self::load(path);
        }

        Self::load_first(&Self::default_paths())
    }

    /// Load the first of `candidates` that exists, or the defaults if none
    /// does. An existing but invalid file is an error.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        for candidate in candidates {
            if candidate.exists() {
                debug!("Loading config from {}", candidate.display());
                return Self::load(candidate);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// `./check-fxz.toml`, then `~/.check-fxz/config.toml`
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".check-fxz").join("config.toml"));
        }
        paths
    }

    /// Local IPv4 networks must be present and pairwise disjoint
    pub fn validate(&self) -> Result<(), ConfigError> {
        let local = self.networks.local_v4();
        if local.is_empty() {
            return Err(ConfigError::NoLocalNetworks);
        }

        for (i, a) in local.iter().enumerate() {
            for b in &local[i + 1..] {
                if a.contains(b) || b.contains(a) {
                    return Err(ConfigError::OverlappingNetworks(*a, *b));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.networks.gateway_v4.len(), 3);
        assert_eq!(
            config.networks.direct_v4,
            vec!["10.211.55.0/24".parse::<Ipv4Net>().unwrap()]
        );
        assert_eq!(config.networks.local_v4().len(), 4);
        assert_eq!(config.detect.tunnel_prefix, "utun");
        assert_eq!(config.detect.ipv6_interface(), Some("en0"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.networks.extra_v6 = vec!["fd00:1::/64".parse().unwrap()];
        config.detect.ipv6_interface = String::new();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.detect.ipv6_interface(), None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let content = "[networks]\ngateway_v4 = [\"172.16.0.0/16\"]\n";
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(
            config.networks.gateway_v4,
            vec!["172.16.0.0/16".parse::<Ipv4Net>().unwrap()]
        );
        assert_eq!(config.networks.direct_v4, default_direct_v4());
        assert_eq!(config.detect, DetectConfig::default());
    }

    #[test]
    fn test_load_invalid_network() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let content = "[networks]\ngateway_v4 = [\"192.168.1.0/99\"]\n";
        std::fs::write(&path, content).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/check-fxz.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_discover_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[detect]\ntunnel_prefix = \"tun\"\n").unwrap();

        let config = Config::discover(Some(&path)).unwrap();
        assert_eq!(config.detect.tunnel_prefix, "tun");
    }

    #[test]
    fn test_load_first_takes_first_existing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let second = dir.path().join("second.toml");
        let third = dir.path().join("third.toml");
        std::fs::write(&second, "[detect]\ntunnel_prefix = \"tun\"\n").unwrap();
        std::fs::write(&third, "[detect]\ntunnel_prefix = \"ppp\"\n").unwrap();

        let config = Config::load_first(&[missing, second, third]).unwrap();

        assert_eq!(config.detect.tunnel_prefix, "tun");
    }

    #[test]
    fn test_load_first_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");

        let config = Config::load_first(&[]).unwrap();
        assert_eq!(config, Config::default());

        let config = Config::load_first(&[missing]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_first_invalid_candidate_is_fatal() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("broken.toml");
        let valid = dir.path().join("valid.toml");
        std::fs::write(&broken, "[networks\n").unwrap();
        std::fs::write(&valid, "").unwrap();

        let result = Config::load_first(&[broken, valid]);

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_overlap() {
        let mut config = Config::default();
        config.networks.direct_v4 = vec!["192.168.0.0/16".parse().unwrap()];

        match config.validate() {
            Err(ConfigError::OverlappingNetworks(a, b)) => {
                assert_eq!(a.to_string(), "192.168.1.0/24");
                assert_eq!(b.to_string(), "192.168.0.0/16");
            }
            other => panic!("Expected OverlappingNetworks, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_empty() {
        let mut config = Config::default();
        config.networks.gateway_v4.clear();
        config.networks.direct_v4.clear();

        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::NoLocalNetworks)));
    }

    #[test]
    fn test_local_networks_merges_extra_v6() {
        let mut config = Config::default();
        config.networks.extra_v6 = vec![
            "fd00:1::/64".parse().unwrap(),
            "2001:db8:1::/64".parse().unwrap(),
        ];
        let detected: Vec<Ipv6Net> = vec!["2001:db8:1::/64".parse().unwrap()];

        let local = config.networks.local_networks(&detected);

        assert_eq!(local.v4, config.networks.local_v4());
        assert_eq!(
            local.v6,
            vec![
                "2001:db8:1::/64".parse::<Ipv6Net>().unwrap(),
                "fd00:1::/64".parse::<Ipv6Net>().unwrap(),
            ]
        );
    }
}
