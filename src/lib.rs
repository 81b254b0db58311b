//! check-fxz - Check & fix local-network routing while the FXZ VPN is up
//!
//! The VPN tunnel captures routes for address ranges that should stay on
//! the LAN. This crate reads the routing table through `ip -j`, finds the
//! offending tunnel routes and prints the `ip route` commands that put the
//! local networks back on the regular gateway.
//!
//! # Architecture
//!
//! - `config`: Configuration file handling (TOML)
//! - `platform`: Routing table and interface snapshots via `ip -j`
//! - `vpn`: Route classification, detection and fix command generation
//!
//! # Usage
//!
//! ```bash
//! check-fxz            # count captured local routes
//! check-fxz --fix | sudo sh
//! ```

pub mod config;
pub mod platform;
pub mod vpn;

pub use config::Config;
pub use vpn::{CheckOptions, CheckReport, run_check};
