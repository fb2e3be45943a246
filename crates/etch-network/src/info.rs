//! Network facts extracted from a DHCP offer.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use dhcproto::v4::{DhcpOption, Message, OptionCode};
use etch_common::{EtchError, EtchResult};
use serde::{Serialize, Serializer};

/// An Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwAddr([u8; 6]);

impl HwAddr {
    /// Create from raw octets.
    #[must_use]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    #[must_use]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for HwAddr {
    type Err = EtchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EtchError::Dhcp {
            message: format!("invalid hardware address: {s}"),
        };

        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for octet in &mut octets {
            let part = parts.next().ok_or_else(invalid)?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(octets))
    }
}

impl Serialize for HwAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Addressing handed out by DHCP for one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// Hardware address the offer was made for.
    pub hw_addr: HwAddr,
    /// Offered IPv4 address.
    pub address: Ipv4Addr,
    /// Prefix length derived from the subnet mask.
    pub prefix_len: u8,
    /// Default gateway, if the server sent a router option.
    pub gateway: Option<Ipv4Addr>,
    /// DNS servers.
    pub nameservers: Vec<Ipv4Addr>,
}

impl NetworkInfo {
    /// Extract network facts from a DHCP offer.
    ///
    /// A missing subnet mask yields a /32 host address.
    pub fn from_offer(offer: &Message) -> EtchResult<Self> {
        let chaddr = offer.chaddr();
        let hw_octets: [u8; 6] = chaddr
            .get(..6)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| EtchError::Dhcp {
                message: "offer carries a short client hardware address".to_string(),
            })?;

        let prefix_len = match offer.opts().get(OptionCode::SubnetMask) {
            Some(DhcpOption::SubnetMask(mask)) => prefix_len(*mask)?,
            _ => {
                tracing::warn!(address = %offer.yiaddr(), "Offer has no subnet mask, using /32");
                32
            }
        };

        let gateway = match offer.opts().get(OptionCode::Router) {
            Some(DhcpOption::Router(routers)) => routers.first().copied(),
            _ => None,
        };

        let nameservers = match offer.opts().get(OptionCode::DomainNameServer) {
            Some(DhcpOption::DomainNameServer(servers)) => servers.clone(),
            _ => Vec::new(),
        };

        Ok(Self {
            hw_addr: HwAddr::new(hw_octets),
            address: offer.yiaddr(),
            prefix_len,
            gateway,
            nameservers,
        })
    }

    /// Address in CIDR notation, e.g. `192.168.1.10/24`.
    #[must_use]
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_len)
    }
}

/// Convert a contiguous subnet mask into a prefix length.
fn prefix_len(mask: Ipv4Addr) -> EtchResult<u8> {
    let bits = u32::from(mask);
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) != 0 {
        return Err(EtchError::Dhcp {
            message: format!("non-contiguous subnet mask {mask}"),
        });
    }
    // leading_ones of a u32 is at most 32.
    Ok(u8::try_from(ones).unwrap_or(32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hw_addr_display_and_parse() {
        let mac: HwAddr = "00:11:22:AA:bb:cc".parse().unwrap();
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
        assert!("00:11:22".parse::<HwAddr>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<HwAddr>().is_err());
        assert!("zz:11:22:33:44:55".parse::<HwAddr>().is_err());
    }

    #[test]
    fn prefix_from_mask() {
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 255, 0)).unwrap(), 24);
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 240, 0)).unwrap(), 20);
        assert_eq!(prefix_len(Ipv4Addr::new(255, 255, 255, 255)).unwrap(), 32);
        assert_eq!(prefix_len(Ipv4Addr::UNSPECIFIED).unwrap(), 0);
        assert!(prefix_len(Ipv4Addr::new(255, 0, 255, 0)).is_err());
    }

    #[test]
    fn extract_from_offer() {
        let mut offer = Message::default();
        offer.set_chaddr(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        offer.set_yiaddr(Ipv4Addr::new(10, 0, 0, 42));
        offer
            .opts_mut()
            .insert(DhcpOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)));
        offer
            .opts_mut()
            .insert(DhcpOption::Router(vec![Ipv4Addr::new(10, 0, 0, 1)]));
        offer.opts_mut().insert(DhcpOption::DomainNameServer(vec![
            Ipv4Addr::new(1, 1, 1, 1),
            Ipv4Addr::new(8, 8, 8, 8),
        ]));

        let info = NetworkInfo::from_offer(&offer).unwrap();
        assert_eq!(info.hw_addr.to_string(), "de:ad:be:ef:00:01");
        assert_eq!(info.cidr(), "10.0.0.42/24");
        assert_eq!(info.gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(info.nameservers.len(), 2);
    }

    #[test]
    fn offer_without_router_or_mask() {
        let mut offer = Message::default();
        offer.set_chaddr(&[0x02, 0, 0, 0, 0, 0x07]);
        offer.set_yiaddr(Ipv4Addr::new(192, 168, 7, 7));

        let info = NetworkInfo::from_offer(&offer).unwrap();
        assert_eq!(info.gateway, None);
        assert!(info.nameservers.is_empty());
        assert_eq!(info.cidr(), "192.168.7.7/32");
    }
}
