//! Layered frame decoder
//!
//! A frame is decoded as Ethernet, then IPv4, then TCP. Each layer is filtered on
//! the type announced by the layer below it: decoding stops with a [`SkipReason`]
//! for frames that are valid but not IPv4/TCP, and with a
//! [`Malformation`](crate::Malformation) for frames whose header lengths do not
//! fit in the captured bytes.
//!
//! ## Example
//!
//! ```rust
//! use pcap_test::{decode_frame, FrameOutcome, RawFrame, SkipReason, EtherType};
//!
//! // an ARP frame
//! let data = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0, 1, 2, 3, 4, 5, 0x08, 0x06];
//! match decode_frame(&RawFrame::new(&data)) {
//!     FrameOutcome::Skip(SkipReason::NonIpEthertype(t)) => assert_eq!(t, EtherType::ARP),
//!     _ => unreachable!(),
//! }
//! ```

use crate::capture::RawFrame;
use crate::error::{HeaderError, Malformation};
use crate::ethernet::{parse_ethernet_header, EtherType, EthernetHeader, MacAddr};
use crate::ipv4::{parse_ipv4_header, IpProtocol, Ipv4Header};
use crate::tcp::{parse_tcp_header, TcpHeader};
use std::fmt;
use std::net::Ipv4Addr;

/// Default number of payload bytes kept in a [`DecodedRecord`]
pub const PAYLOAD_PREVIEW_LEN: usize = 10;

/// Why a well-formed frame was not decoded
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The ethernet payload is not IPv4
    NonIpEthertype(EtherType),
    /// The IPv4 payload is not TCP
    NonTcpProtocol(IpProtocol),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::NonIpEthertype(t) => write!(f, "not an IPv4 frame (ethertype {})", t),
            SkipReason::NonTcpProtocol(p) => write!(f, "not a TCP packet (protocol {})", p),
        }
    }
}

/// The first bytes of a TCP payload
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PayloadPreview<'a> {
    /// The headers consume the entire captured frame
    Empty,
    Data(&'a [u8]),
}

impl<'a> PayloadPreview<'a> {
    /// Keep at most `limit` bytes of `payload`
    pub fn new(payload: &'a [u8], limit: usize) -> PayloadPreview<'a> {
        if payload.is_empty() || limit == 0 {
            PayloadPreview::Empty
        } else {
            PayloadPreview::Data(&payload[..payload.len().min(limit)])
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            PayloadPreview::Empty => &[],
            PayloadPreview::Data(d) => d,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Headers and payload preview of an Ethernet/IPv4/TCP frame
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DecodedRecord<'a> {
    pub ethernet: EthernetHeader,
    pub ipv4: Ipv4Header<'a>,
    pub tcp: TcpHeader<'a>,
    /// Offset of the TCP payload in the frame
    pub payload_offset: usize,
    pub payload: PayloadPreview<'a>,
    /// Number of bytes captured
    pub caplen: usize,
    /// Length of the frame on the wire
    pub origlen: u32,
}

impl<'a> DecodedRecord<'a> {
    pub fn source_mac(&self) -> MacAddr {
        self.ethernet.source
    }
    pub fn destination_mac(&self) -> MacAddr {
        self.ethernet.destination
    }
    pub fn source_addr(&self) -> Ipv4Addr {
        self.ipv4.source
    }
    pub fn destination_addr(&self) -> Ipv4Addr {
        self.ipv4.destination
    }
    pub fn source_port(&self) -> u16 {
        self.tcp.source_port
    }
    pub fn destination_port(&self) -> u16 {
        self.tcp.destination_port
    }
}

/// Result of decoding one frame
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameOutcome<'a> {
    Decoded(DecodedRecord<'a>),
    Skip(SkipReason),
    Malformed(Malformation),
}

fn malformation(e: nom::Err<HeaderError>, fallback: Malformation) -> Malformation {
    match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.malformation(fallback),
        nom::Err::Incomplete(_) => fallback,
    }
}

/// Frame decoder
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decoder {
    preview_len: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(PAYLOAD_PREVIEW_LEN)
    }
}

impl Decoder {
    /// Creates a decoder keeping at most `preview_len` bytes of payload
    pub const fn new(preview_len: usize) -> Decoder {
        Decoder { preview_len }
    }

    pub const fn preview_len(&self) -> usize {
        self.preview_len
    }

    /// Decode one frame.
    ///
    /// Every offset is derived from the IHL and data offset fields, and checked
    /// against the captured length before it is used. The returned record borrows
    /// the frame data.
    pub fn decode<'a>(&self, frame: &RawFrame<'a>) -> FrameOutcome<'a> {
        let data = frame.data;

        let (rem, ethernet) = match parse_ethernet_header(data) {
            Ok(r) => r,
            Err(e) => {
                return FrameOutcome::Malformed(malformation(e, Malformation::TooShortForEthernet))
            }
        };
        if ethernet.ether_type != EtherType::IPV4 {
            return FrameOutcome::Skip(SkipReason::NonIpEthertype(ethernet.ether_type));
        }

        let (rem, ipv4) = match parse_ipv4_header(rem) {
            Ok(r) => r,
            Err(e) => return FrameOutcome::Malformed(malformation(e, Malformation::TooShortForIpv4)),
        };
        if ipv4.protocol != IpProtocol::TCP {
            return FrameOutcome::Skip(SkipReason::NonTcpProtocol(ipv4.protocol));
        }

        let (payload, tcp) = match parse_tcp_header(rem) {
            Ok(r) => r,
            Err(e) => return FrameOutcome::Malformed(malformation(e, Malformation::TooShortForTcp)),
        };

        let payload_offset = data.len() - payload.len();
        FrameOutcome::Decoded(DecodedRecord {
            ethernet,
            ipv4,
            tcp,
            payload_offset,
            payload: PayloadPreview::new(payload, self.preview_len),
            caplen: data.len(),
            origlen: frame.origlen,
        })
    }
}

/// Decode one frame with the default options.
pub fn decode_frame<'a>(frame: &RawFrame<'a>) -> FrameOutcome<'a> {
    Decoder::default().decode(frame)
}
