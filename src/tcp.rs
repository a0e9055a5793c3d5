//! TCP header
//!
//! Transmission Control Protocol. Static header size: 20 bytes, followed by up to
//! 40 bytes of options. The actual length is given by the data offset field, in
//! 32-bit words.

use crate::error::{HeaderError, Malformation};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, be_u8};
use nom::IResult;
use std::fmt;

/// Minimum length of a TCP header (data offset = 5)
pub const TCP_MIN_HEADER_LEN: usize = 20;

/// TCP control flags
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TcpFlags(pub u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);
    pub const ECE: TcpFlags = TcpFlags(0x40);
    pub const CWR: TcpFlags = TcpFlags(0x80);

    const NAMES: [(TcpFlags, &'static str); 8] = [
        (TcpFlags::FIN, "FIN"),
        (TcpFlags::SYN, "SYN"),
        (TcpFlags::RST, "RST"),
        (TcpFlags::PSH, "PSH"),
        (TcpFlags::ACK, "ACK"),
        (TcpFlags::URG, "URG"),
        (TcpFlags::ECE, "ECE"),
        (TcpFlags::CWR, "CWR"),
    ];

    #[inline]
    pub fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TcpFlags {
    type Output = TcpFlags;
    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES.iter() {
            if self.contains(*flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// TCP header
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TcpHeader<'a> {
    pub source_port: u16,
    pub destination_port: u16,
    pub sequence: u32,
    pub acknowledgement: u32,
    /// Header length, in 32-bit words
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    pub options: &'a [u8],
}

impl<'a> TcpHeader<'a> {
    /// Header length in bytes, including options
    #[inline]
    pub fn header_len(&self) -> usize {
        usize::from(self.data_offset) * 4
    }
}

/// Read a TCP header
///
/// The header length is taken from the data offset field and checked against the
/// input before any field is read: fails with `TooShortForTcp` if the input is
/// shorter than 20 bytes, and with `BadTcpHeaderLength` if the data offset is less
/// than 5 or describes a header longer than the input.
///
/// Returns the remaining data (the TCP payload, as captured) and the header.
pub fn parse_tcp_header(i: &[u8]) -> IResult<&[u8], TcpHeader, HeaderError> {
    if i.len() < TCP_MIN_HEADER_LEN {
        return Err(nom::Err::Error(Malformation::TooShortForTcp.into()));
    }
    let header_len = usize::from(i[12] >> 4) * 4;
    if header_len < TCP_MIN_HEADER_LEN || header_len > i.len() {
        return Err(nom::Err::Error(Malformation::BadTcpHeaderLength.into()));
    }
    let (rem, hdr) = take(header_len)(i)?;
    let (hdr, source_port) = be_u16(hdr)?;
    let (hdr, destination_port) = be_u16(hdr)?;
    let (hdr, sequence) = be_u32(hdr)?;
    let (hdr, acknowledgement) = be_u32(hdr)?;
    let (hdr, offset_reserved) = be_u8(hdr)?;
    let (hdr, flags) = be_u8(hdr)?;
    let (hdr, window) = be_u16(hdr)?;
    let (hdr, checksum) = be_u16(hdr)?;
    let (options, urgent_pointer) = be_u16(hdr)?;
    let header = TcpHeader {
        source_port,
        destination_port,
        sequence,
        acknowledgement,
        data_offset: offset_reserved >> 4,
        flags: TcpFlags(flags),
        window,
        checksum,
        urgent_pointer,
        options,
    };
    Ok((rem, header))
}
