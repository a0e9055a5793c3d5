//! Capture sources and the frames they hand out

use crate::error::CaptureError;
use std::convert::TryFrom;
use std::time::Duration;

/// Default snapshot length (maximum bytes captured per frame)
pub const DEFAULT_SNAPLEN: i32 = 8192;

/// Default read timeout of a live capture
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// One link-layer frame, as captured
///
/// `data` holds exactly the captured bytes: its length is the capture length,
/// which can be smaller than `origlen` when the capture was truncated by the
/// snapshot length.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    /// The date and time when this frame was captured (seconds since epoch)
    pub ts_sec: u32,
    /// The date and time when this frame was captured (microseconds part)
    pub ts_usec: u32,
    /// The length of the frame as it appeared on the network
    pub origlen: u32,
    pub data: &'a [u8],
}

impl<'a> RawFrame<'a> {
    /// Creates a frame with no timestamp, whose original length is the capture length
    pub fn new(data: &'a [u8]) -> RawFrame<'a> {
        RawFrame {
            ts_sec: 0,
            ts_usec: 0,
            origlen: data.len() as u32,
            data,
        }
    }

    /// The number of bytes actually captured
    #[inline]
    pub fn caplen(&self) -> usize {
        self.data.len()
    }

    /// Returns true if fewer bytes were captured than were seen on the wire
    pub fn is_truncated(&self) -> bool {
        (self.caplen() as u64) < u64::from(self.origlen)
    }
}

/// Result of pulling from a [`CaptureSource`]
#[derive(Debug)]
pub enum NextFrame<'a> {
    /// A frame was captured. It is valid until the next call on the source
    Frame(RawFrame<'a>),
    /// Nothing was received before the read timeout expired
    NoDataYet,
    /// A read failed, but the capture can go on
    RecoverableError(String),
    /// The capture cannot go on
    TerminalError(String),
    /// No more frames (end of file, or capture broken off)
    StreamEnded,
}

/// A source of captured frames
///
/// Sources are opened by their constructors (see [`open_live`] and
/// [`PcapFileSource`](crate::PcapFileSource)), pulled with `next_frame`, and
/// released with `close`. A closed source only returns `StreamEnded`.
pub trait CaptureSource {
    /// Get the next frame, blocking up to the source timeout.
    ///
    /// The returned frame borrows the source buffer and must be dropped before the
    /// next call.
    fn next_frame(&mut self) -> NextFrame<'_>;

    /// Release the underlying capture handle.
    fn close(&mut self) {}
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn next_frame(&mut self) -> NextFrame<'_> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<'s, S: CaptureSource + ?Sized> CaptureSource for &'s mut S {
    fn next_frame(&mut self) -> NextFrame<'_> {
        (**self).next_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Configuration of a live capture
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureConfig {
    /// Name of the network interface (for ex. `eth0`)
    pub interface: String,
    /// Maximum bytes to capture per frame
    pub snaplen: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Read timeout: how long `next_frame` may block before returning `NoDataYet`
    pub timeout: Duration,
}

impl CaptureConfig {
    pub fn new<S: Into<String>>(interface: S) -> CaptureConfig {
        CaptureConfig {
            interface: interface.into(),
            snaplen: DEFAULT_SNAPLEN,
            promiscuous: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read timeout in milliseconds, saturated to the range accepted by libpcap
    pub fn timeout_ms(&self) -> i32 {
        i32::try_from(self.timeout.as_millis()).unwrap_or(i32::MAX)
    }
}

/// Open a live capture on the configured interface.
///
/// Fails with `CaptureError::LiveCaptureUnavailable` if the crate was built
/// without the `live` feature.
#[cfg(feature = "live")]
pub fn open_live(config: &CaptureConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
    let source = crate::live::LiveSource::open(config)?;
    Ok(Box::new(source))
}

/// Open a live capture on the configured interface.
///
/// Fails with `CaptureError::LiveCaptureUnavailable` if the crate was built
/// without the `live` feature.
#[cfg(not(feature = "live"))]
pub fn open_live(config: &CaptureConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
    tracing::debug!(interface = %config.interface, "live capture requested");
    Err(CaptureError::LiveCaptureUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::new("wlan0");
        assert_eq!(config.interface, "wlan0");
        assert_eq!(config.snaplen, 8192);
        assert!(config.promiscuous);
        assert_eq!(config.timeout_ms(), 1000);
    }

    #[test]
    fn test_timeout_saturates() {
        let mut config = CaptureConfig::new("eth0");
        config.timeout = Duration::from_secs(u64::MAX / 4);
        assert_eq!(config.timeout_ms(), i32::MAX);
    }

    #[test]
    fn test_raw_frame_lengths() {
        let data = [0u8; 54];
        let mut frame = RawFrame::new(&data);
        assert_eq!(frame.caplen(), 54);
        assert!(!frame.is_truncated());
        frame.origlen = 1514;
        assert!(frame.is_truncated());
    }

    #[cfg(not(feature = "live"))]
    #[test]
    fn test_open_live_unavailable() {
        let res = open_live(&CaptureConfig::new("eth0"));
        assert!(matches!(res, Err(CaptureError::LiveCaptureUnavailable)));
    }
}
