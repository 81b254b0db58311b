//! FXZ VPN route checking
//!
//! The FXZ client installs tunnel routes that swallow parts of the local
//! network (and, with IPv6 disabled, a pair of IPv6 half-default routes).
//! This module finds those routes and produces the commands to undo them.

pub mod checker;
pub mod classify;
pub mod detect;
pub mod remediation;
pub mod route;

pub use checker::{CheckError, CheckOptions, CheckReport, run_check};
pub use classify::{Classification, LocalNetworks, classify};
pub use route::{AddressFamily, Destination, RouteRecord};
