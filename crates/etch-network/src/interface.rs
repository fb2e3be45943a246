//! Interface discovery.
//!
//! These functions read the interface table of the calling thread's network
//! namespace; call them from inside [`run_in_netns`](crate::run_in_netns) to
//! see the host's interfaces.

use std::net::Ipv4Addr;

use etch_common::{EtchError, EtchResult};

use crate::info::HwAddr;

/// Global unicast test for IPv4.
///
/// Everything except unspecified, loopback, multicast, link-local and the
/// limited broadcast address counts, private ranges included.
#[must_use]
pub fn is_global_unicast(ip: Ipv4Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        || ip.is_link_local()
        || ip.is_broadcast())
}

/// Name of the first interface carrying a global unicast IPv4 address.
pub fn first_global_unicast() -> EtchResult<String> {
    let interfaces = netdev::get_interfaces();

    let found = interfaces
        .into_iter()
        .find(|iface| iface.ipv4.iter().any(|net| is_global_unicast(net.addr)))
        .ok_or_else(|| EtchError::InterfaceNotFound {
            name: "no interface with a global unicast IPv4 address".to_string(),
        })?;

    tracing::debug!(interface = %found.name, "Selected provisioning interface");
    Ok(found.name)
}

/// Hardware address of the named interface.
pub fn hardware_address(name: &str) -> EtchResult<HwAddr> {
    let iface = netdev::get_interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| EtchError::InterfaceNotFound {
            name: name.to_string(),
        })?;

    let mac = iface.mac_addr.ok_or_else(|| EtchError::InterfaceNotFound {
        name: format!("{name} (no hardware address)"),
    })?;

    Ok(HwAddr::new(mac.octets()))
}
