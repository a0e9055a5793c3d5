//! Live capture from a network interface, based on libpcap

use crate::capture::{CaptureConfig, CaptureSource, NextFrame, RawFrame};
use crate::error::CaptureError;
use crate::linktype::Linktype;
use pcap::{Active, Capture};
use tracing::{debug, info};

/// Capture source reading frames from a network interface
pub struct LiveSource {
    interface: String,
    capture: Option<Capture<Active>>,
}

impl LiveSource {
    /// Open the interface named by `config`, with its snapshot length, promiscuous
    /// mode and read timeout.
    ///
    /// Only Ethernet devices are accepted.
    pub fn open(config: &CaptureConfig) -> Result<LiveSource, CaptureError> {
        let open_error = |e: pcap::Error| CaptureError::Open {
            interface: config.interface.clone(),
            reason: e.to_string(),
        };
        debug!(interface = %config.interface, "opening live capture");
        let capture = Capture::from_device(config.interface.as_str())
            .map_err(open_error)?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms())
            .open()
            .map_err(open_error)?;
        let datalink = capture.get_datalink();
        if datalink != pcap::Linktype::ETHERNET {
            return Err(CaptureError::UnsupportedLinktype(Linktype(datalink.0)));
        }
        info!(
            interface = %config.interface,
            snaplen = config.snaplen,
            promiscuous = config.promiscuous,
            "live capture started"
        );
        Ok(LiveSource {
            interface: config.interface.clone(),
            capture: Some(capture),
        })
    }
}

impl CaptureSource for LiveSource {
    fn next_frame(&mut self) -> NextFrame<'_> {
        let capture = match self.capture.as_mut() {
            Some(capture) => capture,
            None => return NextFrame::StreamEnded,
        };
        match capture.next_packet() {
            Ok(packet) => NextFrame::Frame(RawFrame {
                ts_sec: packet.header.ts.tv_sec as u32,
                ts_usec: packet.header.ts.tv_usec as u32,
                origlen: packet.header.len,
                data: packet.data,
            }),
            Err(pcap::Error::TimeoutExpired) => NextFrame::NoDataYet,
            Err(pcap::Error::NoMorePackets) => NextFrame::StreamEnded,
            Err(pcap::Error::PcapError(msg)) => NextFrame::TerminalError(msg),
            Err(e) => NextFrame::RecoverableError(e.to_string()),
        }
    }

    fn close(&mut self) {
        if self.capture.take().is_some() {
            debug!(interface = %self.interface, "live capture closed");
        }
    }
}
