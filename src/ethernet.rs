//! Ethernet II header
//!
//! Static header size: 14 bytes (destination address, source address, ethertype).

use crate::error::{HeaderError, Malformation};
use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;
use rusticata_macros::newtype_enum;
use std::fmt;

/// Length of an Ethernet II header
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Number of bytes in an ethernet (MAC) address
pub const ETHER_ADDR_LEN: usize = 6;

/// A 48-bit MAC address, in wire order
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MacAddr(pub [u8; ETHER_ADDR_LEN]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff; ETHER_ADDR_LEN]);

    #[inline]
    pub fn octets(&self) -> [u8; ETHER_ADDR_LEN] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 == 0x01
    }
}

impl From<[u8; ETHER_ADDR_LEN]> for MacAddr {
    fn from(addr: [u8; ETHER_ADDR_LEN]) -> MacAddr {
        MacAddr(addr)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let a = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

/// Ethernet payload type
///
/// See <https://www.iana.org/assignments/ieee-802-numbers/ieee-802-numbers.xhtml>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EtherType(pub u16);

newtype_enum! {
impl display EtherType {
    IPV4 = 0x0800,
    ARP = 0x0806,
    WAKE_ON_LAN = 0x0842,
    RARP = 0x8035,
    VLAN = 0x8100,
    IPX = 0x8137,
    IPV6 = 0x86dd,
    FLOW_CONTROL = 0x8808,
    MPLS = 0x8847,
    PPPOE_DISCOVERY = 0x8863,
    PPPOE_SESSION = 0x8864,
    QINQ = 0x88a8,
    LLDP = 0x88cc,
}
}

/// Ethernet II header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    /// Payload type, converted to host order
    pub ether_type: EtherType,
}

fn parse_mac_addr(i: &[u8]) -> IResult<&[u8], MacAddr, HeaderError> {
    let (i, bytes) = take(ETHER_ADDR_LEN)(i)?;
    let mut addr = [0u8; ETHER_ADDR_LEN];
    addr.copy_from_slice(bytes);
    Ok((i, MacAddr(addr)))
}

/// Read an Ethernet II header
///
/// Returns the remaining data (the ethernet payload) and the header.
/// Fails with `TooShortForEthernet` if the input holds less than 14 bytes.
pub fn parse_ethernet_header(i: &[u8]) -> IResult<&[u8], EthernetHeader, HeaderError> {
    if i.len() < ETHERNET_HEADER_LEN {
        return Err(nom::Err::Error(Malformation::TooShortForEthernet.into()));
    }
    let (i, destination) = parse_mac_addr(i)?;
    let (i, source) = parse_mac_addr(i)?;
    let (i, ether_type) = be_u16(i)?;
    let header = EthernetHeader {
        destination,
        source,
        ether_type: EtherType(ether_type),
    };
    Ok((i, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const ETH_IPV4: &[u8] = &hex!(
        "
00 11 22 33 44 55 66 77 88 99 aa bb 08 00 45 00"
    );

    #[test]
    fn test_parse_ethernet_header() {
        let (rem, eth) = parse_ethernet_header(ETH_IPV4).expect("ethernet header");
        assert_eq!(eth.destination, MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
        assert_eq!(eth.source, MacAddr([0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]));
        assert_eq!(eth.ether_type, EtherType::IPV4);
        assert_eq!(rem, &[0x45, 0x00]);
    }

    #[test]
    fn test_ethertype_network_order() {
        let (_, eth) = parse_ethernet_header(&hex!("ffffffffffff 000000000001 0806")).unwrap();
        assert_eq!(eth.ether_type.0, 0x0806);
        assert_eq!(eth.ether_type, EtherType::ARP);
        assert!(eth.destination.is_broadcast());
        assert!(eth.destination.is_multicast());
        assert!(!eth.source.is_multicast());
        assert_eq!(eth.source.octets(), [0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_ethernet_too_short() {
        for len in 0..ETHERNET_HEADER_LEN {
            let res = parse_ethernet_header(&ETH_IPV4[..len]);
            assert_eq!(
                res,
                Err(nom::Err::Error(HeaderError::Malformed(
                    Malformation::TooShortForEthernet
                )))
            );
        }
    }

    #[test]
    fn test_display() {
        let mac = MacAddr([0x00, 0x1b, 0x2c, 0xd3, 0xe4, 0xff]);
        assert_eq!(mac.to_string(), "00:1b:2c:d3:e4:ff");
        assert_eq!(EtherType::IPV4.to_string(), "IPV4");
        assert_eq!(EtherType(0x86dd).to_string(), "IPV6");
    }
}
