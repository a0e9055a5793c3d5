use crate::linktype::Linktype;
use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

/// Inconsistency between the header length fields of a frame and the number of
/// bytes actually captured.
///
/// A malformed frame is reported and skipped; it never stops a capture.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Malformation {
    #[error("frame too short for an ethernet header")]
    TooShortForEthernet,
    #[error("frame too short for an IPv4 header")]
    TooShortForIpv4,
    #[error("IPv4 header length out of bounds")]
    BadIpHeaderLength,
    #[error("frame too short for a TCP header")]
    TooShortForTcp,
    #[error("TCP data offset out of bounds")]
    BadTcpHeaderLength,
}

/// Error type of the network header parsers
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HeaderError {
    Malformed(Malformation),

    NomError(ErrorKind),
}

impl HeaderError {
    /// Resolve this error to a malformation, using `fallback` for low-level parser errors.
    pub fn malformation(self, fallback: Malformation) -> Malformation {
        match self {
            HeaderError::Malformed(m) => m,
            HeaderError::NomError(_) => fallback,
        }
    }
}

impl From<Malformation> for HeaderError {
    fn from(m: Malformation) -> Self {
        HeaderError::Malformed(m)
    }
}

impl<I> ParseError<I> for HeaderError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        HeaderError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        HeaderError::NomError(kind)
    }
}

/// Error type of the pcap record parsers
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PcapError {
    HeaderNotRecognized,

    NomError(ErrorKind),
}

impl<I> ParseError<I> for PcapError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(kind)
    }
}

/// Failure to open or configure a capture source
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pcap file header not recognized")]
    HeaderNotRecognized,

    #[error("pcap file header is incomplete")]
    IncompleteHeader,

    #[error("invalid pcap file header ({0:?})")]
    InvalidHeader(ErrorKind),

    #[error("unsupported link type {0}, only ETHERNET frames can be decoded")]
    UnsupportedLinktype(Linktype),

    #[error("cannot open capture on '{interface}': {reason}")]
    Open { interface: String, reason: String },

    #[error("live capture support is not enabled (rebuild with the `live` feature)")]
    LiveCaptureUnavailable,
}

impl From<PcapError> for CaptureError {
    fn from(e: PcapError) -> Self {
        match e {
            PcapError::HeaderNotRecognized => CaptureError::HeaderNotRecognized,
            PcapError::NomError(kind) => CaptureError::InvalidHeader(kind),
        }
    }
}
