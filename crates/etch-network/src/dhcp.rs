//! Minimal DHCPv4 client: broadcast DISCOVER, take the first OFFER.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use dhcproto::v4::{DhcpOption, Flags, Message, MessageType, Opcode, OptionCode};
use dhcproto::{Decodable, Encodable};
use etch_common::{EtchError, EtchResult};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use crate::info::HwAddr;

/// DHCP server port.
pub const DHCP_SERVER_PORT: u16 = 67;
/// DHCP client port.
pub const DHCP_CLIENT_PORT: u16 = 68;
/// Default bound on the whole exchange.
pub const DEFAULT_DHCP_TIMEOUT: Duration = Duration::from_secs(120);

/// How often DISCOVER is resent while no offer has arrived.
const RETRANSMIT_INTERVAL: Duration = Duration::from_secs(4);

/// A DHCP client bound to one interface.
pub struct DhcpClient {
    socket: UdpSocket,
    server: SocketAddr,
    interface: String,
    hw_addr: HwAddr,
}

impl DhcpClient {
    /// Bind the client port on `interface` and broadcast to the server port.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(interface: &str, hw_addr: HwAddr) -> EtchResult<Self> {
        let socket = client_socket(Some(interface), DHCP_CLIENT_PORT).map_err(|e| {
            EtchError::Dhcp {
                message: format!("failed to bind client port on {interface}: {e}"),
            }
        })?;
        let socket = UdpSocket::from_std(socket).map_err(|e| EtchError::Dhcp {
            message: format!("failed to register socket on {interface}: {e}"),
        })?;

        tracing::debug!(interface, %hw_addr, "DHCP client bound");

        Ok(Self::with_socket(
            socket,
            SocketAddr::from((Ipv4Addr::BROADCAST, DHCP_SERVER_PORT)),
            interface,
            hw_addr,
        ))
    }

    /// Build a client around an already bound socket.
    pub fn with_socket(
        socket: UdpSocket,
        server: SocketAddr,
        interface: impl Into<String>,
        hw_addr: HwAddr,
    ) -> Self {
        Self {
            socket,
            server,
            interface: interface.into(),
            hw_addr,
        }
    }

    /// Broadcast DISCOVER and wait for the first matching OFFER.
    ///
    /// The exchange is cancelled once `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`EtchError::DhcpTimeout`] if no offer arrives in time, or
    /// [`EtchError::Dhcp`] on socket errors.
    pub async fn discover_offer(&self, timeout: Duration) -> EtchResult<Message> {
        tracing::info!(interface = %self.interface, ?timeout, "Starting DHCP discovery");

        tokio::time::timeout(timeout, self.exchange())
            .await
            .map_err(|_| EtchError::DhcpTimeout {
                interface: self.interface.clone(),
                timeout,
            })?
    }

    async fn exchange(&self) -> EtchResult<Message> {
        let xid = new_xid();
        let discover = build_discover(xid, self.hw_addr)
            .to_vec()
            .map_err(|e| EtchError::Dhcp {
                message: format!("failed to encode DISCOVER: {e}"),
            })?;

        let mut retransmit = tokio::time::interval(RETRANSMIT_INTERVAL);
        let mut buf = vec![0u8; 1500];

        loop {
            tokio::select! {
                _ = retransmit.tick() => {
                    self.socket
                        .send_to(&discover, self.server)
                        .await
                        .map_err(|e| EtchError::Dhcp {
                            message: format!("failed to send DISCOVER: {e}"),
                        })?;
                    tracing::debug!(xid, server = %self.server, "Sent DHCPDISCOVER");
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, from) = received.map_err(|e| EtchError::Dhcp {
                        message: format!("failed to receive: {e}"),
                    })?;
                    if let Some(offer) = parse_offer(&buf[..len], xid) {
                        tracing::info!(
                            %from,
                            offered = %offer.yiaddr(),
                            "Received DHCPOFFER"
                        );
                        return Ok(offer);
                    }
                    tracing::trace!(%from, len, "Ignoring unrelated DHCP packet");
                }
            }
        }
    }
}

fn new_xid() -> u32 {
    // Low 32 bits of a v4 UUID are random.
    #[allow(clippy::cast_possible_truncation)]
    let xid = uuid::Uuid::new_v4().as_u128() as u32;
    xid
}

/// Build a broadcast DHCPDISCOVER for `hw_addr`.
fn build_discover(xid: u32, hw_addr: HwAddr) -> Message {
    let mut msg = Message::default();
    msg.set_opcode(Opcode::BootRequest);
    msg.set_xid(xid);
    msg.set_flags(Flags::default().set_broadcast());
    msg.set_chaddr(&hw_addr.octets());

    msg.opts_mut()
        .insert(DhcpOption::MessageType(MessageType::Discover));
    msg.opts_mut()
        .insert(DhcpOption::ParameterRequestList(vec![
            OptionCode::SubnetMask,
            OptionCode::Router,
            OptionCode::DomainNameServer,
        ]));

    msg
}

/// Decode `data` and return it if it is an OFFER for `xid`.
fn parse_offer(data: &[u8], xid: u32) -> Option<Message> {
    let msg = Message::from_bytes(data).ok()?;
    if msg.opcode() != Opcode::BootReply || msg.xid() != xid {
        return None;
    }

    match msg.opts().get(OptionCode::MessageType) {
        Some(DhcpOption::MessageType(MessageType::Offer)) => Some(msg),
        _ => None,
    }
}

/// Open a broadcast-capable UDP socket on `0.0.0.0:port`.
///
/// The address is shared with `SO_REUSEADDR` so a host DHCP client holding
/// the port does not block us. With `interface` set the socket only sees
/// traffic of that device.
fn client_socket(interface: Option<&str>, port: u16) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    if let Some(interface) = interface {
        socket.bind_device(Some(interface.as_bytes()))?;
    }
    socket.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)).into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
