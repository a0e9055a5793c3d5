//! IPv4 header
//!
//! Internet Protocol, version 4. Static header size: 20 bytes, followed by up to
//! 40 bytes of options. The actual length is given by the IHL field, in 32-bit words.

use crate::error::{HeaderError, Malformation};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use rusticata_macros::newtype_enum;
use std::net::Ipv4Addr;

/// Minimum length of an IPv4 header (IHL = 5)
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Reserved fragment flag
pub const IP_RF: u8 = 0b100;
/// Don't fragment flag
pub const IP_DF: u8 = 0b010;
/// More fragments flag
pub const IP_MF: u8 = 0b001;

/// IP transport protocol number
///
/// See <https://www.iana.org/assignments/protocol-numbers/protocol-numbers.xhtml>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IpProtocol(pub u8);

newtype_enum! {
impl display IpProtocol {
    HOPOPT = 0,
    ICMP = 1,
    IGMP = 2,
    IPIP = 4,
    TCP = 6,
    UDP = 17,
    IPV6 = 41,
    GRE = 47,
    ESP = 50,
    AH = 51,
    ICMPV6 = 58,
    OSPF = 89,
    SCTP = 132,
}
}

/// IPv4 header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ipv4Header<'a> {
    pub version: u8,
    /// Header length, in 32-bit words
    pub ihl: u8,
    pub tos: u8,
    pub total_length: u16,
    pub identification: u16,
    /// The 3 flag bits (`IP_RF`, `IP_DF`, `IP_MF`)
    pub flags: u8,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub options: &'a [u8],
}

impl<'a> Ipv4Header<'a> {
    /// Header length in bytes, including options
    #[inline]
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl) * 4
    }

    pub fn dont_fragment(&self) -> bool {
        self.flags & IP_DF != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags & IP_MF != 0
    }
}

/// Read an IPv4 header
///
/// The header length is taken from the IHL field and checked against the input
/// before any field is read: fails with `TooShortForIpv4` if the input is shorter
/// than 20 bytes, and with `BadIpHeaderLength` if IHL is less than 5 or describes
/// a header longer than the input.
///
/// Returns the remaining data (the IP payload, as captured) and the header.
pub fn parse_ipv4_header(i: &[u8]) -> IResult<&[u8], Ipv4Header, HeaderError> {
    if i.len() < IPV4_MIN_HEADER_LEN {
        return Err(nom::Err::Error(Malformation::TooShortForIpv4.into()));
    }
    let header_len = usize::from(i[0] & 0x0f) * 4;
    if header_len < IPV4_MIN_HEADER_LEN || header_len > i.len() {
        return Err(nom::Err::Error(Malformation::BadIpHeaderLength.into()));
    }
    let (rem, hdr) = take(header_len)(i)?;
    let (hdr, version_ihl) = be_u8(hdr)?;
    let (hdr, tos) = be_u8(hdr)?;
    let (hdr, total_length) = be_u16(hdr)?;
    let (hdr, identification) = be_u16(hdr)?;
    let (hdr, flags_offset) = be_u16(hdr)?;
    let (hdr, ttl) = be_u8(hdr)?;
    let (hdr, protocol) = be_u8(hdr)?;
    let (hdr, checksum) = be_u16(hdr)?;
    let (hdr, source) = be_u32(hdr)?;
    let (options, destination) = be_u32(hdr)?;
    let header = Ipv4Header {
        version: version_ihl >> 4,
        ihl: version_ihl & 0x0f,
        tos,
        total_length,
        identification,
        flags: (flags_offset >> 13) as u8,
        fragment_offset: flags_offset & 0x1fff,
        ttl,
        protocol: IpProtocol(protocol),
        checksum,
        source: Ipv4Addr::from(source),
        destination: Ipv4Addr::from(destination),
        options,
    };
    Ok((rem, header))
}
