//! # Ethernet/IPv4/TCP frame decoder
//!
//! This crate captures link-layer frames, from a network interface or from a
//! legacy pcap file, and decodes their Ethernet, IPv4 and TCP headers.
//!
//! Every header is parsed with [nom](https://docs.rs/nom) field parsers, without
//! copying data (zero-copy), and every length field read from a frame is checked
//! against the number of captured bytes before it is used: a frame that lies about
//! its header lengths is reported as malformed, and never read out of bounds.
//!
//! Decoding a frame gives one of three outcomes ([`FrameOutcome`]):
//! - `Decoded`: the frame is Ethernet/IPv4/TCP, and a [`DecodedRecord`] holds its
//!   addresses, ports and the first bytes of its payload
//! - `Skip`: the frame is well-formed but carries something else (ARP, IPv6, UDP ...)
//! - `Malformed`: the header lengths do not fit in the captured bytes
//!
//! # Example: replaying a pcap file
//!
//! A [`Driver`] pulls frames from a [`CaptureSource`], decodes them and reports the
//! outcomes to a [`Sink`].
//!
//! ```rust,no_run
//! use pcap_test::{CancelToken, Driver, PcapFileSource, TextSink};
//! use std::io;
//!
//! let source = PcapFileSource::open("capture.pcap").expect("PcapFileSource");
//! let stdout = io::stdout();
//! let mut sink = TextSink::new(stdout.lock());
//! let summary = Driver::default().run(source, &mut sink, &CancelToken::new());
//! println!("{} frames, {} TCP", summary.stats.frames, summary.stats.decoded);
//! ```
//!
//! Live capture from an interface (see [`open_live`]) requires the `live` feature,
//! and libpcap.

mod error;
mod linktype;
pub use error::*;
pub use linktype::*;

pub mod ethernet;
pub mod ipv4;
pub mod tcp;
pub use ethernet::{EtherType, EthernetHeader, MacAddr};
pub use ipv4::{IpProtocol, Ipv4Header};
pub use tcp::{TcpFlags, TcpHeader};

mod capture;
mod decode;
pub use capture::*;
pub use decode::*;

pub mod pcap_file;
pub use pcap_file::PcapFileSource;

#[cfg(feature = "live")]
pub mod live;
#[cfg(feature = "live")]
pub use live::LiveSource;

mod driver;
mod sink;
pub use driver::*;
pub use sink::*;
