//! # etch-network
//!
//! Host network discovery for etch.
//!
//! Provisioning containers usually run in their own network namespace. This
//! crate reaches into the host's namespace on a dedicated thread to find the
//! provisioning interface and ask DHCP for its addressing.

#![warn(missing_docs)]

pub mod dhcp;
pub mod discover;
pub mod info;
pub mod interface;
pub mod netns;

pub use dhcp::{DEFAULT_DHCP_TIMEOUT, DhcpClient};
pub use discover::discover_host_network;
pub use info::{HwAddr, NetworkInfo};
pub use netns::run_in_netns;
