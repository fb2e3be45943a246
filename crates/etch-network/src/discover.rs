//! DHCP discovery in the host network namespace.

use std::path::PathBuf;
use std::time::Duration;

use etch_common::EtchResult;

use crate::dhcp::DhcpClient;
use crate::info::NetworkInfo;
use crate::interface::{first_global_unicast, hardware_address};
use crate::netns::run_in_netns;

/// Discover the provisioning interface's DHCP parameters from the host
/// network namespace at `host_netns`.
///
/// Without an `interface` override the first interface holding a global
/// unicast IPv4 address is used. Interface lookup, socket setup and the
/// exchange all run inside the namespace; the caller's thread is never moved.
pub async fn discover_host_network(
    host_netns: impl Into<PathBuf>,
    interface: Option<String>,
    timeout: Duration,
) -> EtchResult<NetworkInfo> {
    let host_netns = host_netns.into();
    tracing::debug!(netns = %host_netns.display(), ?interface, "Discovering host network");

    run_in_netns(host_netns, move || async move {
        let name = match interface {
            Some(name) => name,
            None => first_global_unicast()?,
        };
        let hw_addr = hardware_address(&name)?;

        let client = DhcpClient::bind(&name, hw_addr)?;
        let offer = client.discover_offer(timeout).await?;
        let info = NetworkInfo::from_offer(&offer)?;

        tracing::info!(
            interface = %name,
            address = %info.cidr(),
            gateway = ?info.gateway,
            "DHCP offer accepted"
        );
        Ok(info)
    })
    .await
}
