//! Presentation of decoding results

use crate::decode::{DecodedRecord, SkipReason};
use crate::error::Malformation;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Something the driving loop reports
#[derive(Clone, Copy, Debug)]
pub enum Event<'a> {
    /// An Ethernet/IPv4/TCP frame was decoded
    Decoded(&'a DecodedRecord<'a>),
    /// A well-formed frame was not decoded
    Skipped(SkipReason),
    /// A frame was dropped because its headers do not fit in the captured bytes
    Malformed(Malformation),
    /// A recoverable capture error
    Warning(&'a str),
}

/// Consumer of [`Event`]s
///
/// An error returned by the sink stops the driving loop.
pub trait Sink {
    fn event(&mut self, event: Event<'_>) -> io::Result<()>;
}

impl<'s, S: Sink + ?Sized> Sink for &'s mut S {
    fn event(&mut self, event: Event<'_>) -> io::Result<()> {
        (**self).event(event)
    }
}

/// Sink writing decoded records as text, one block per record
///
/// ```text
/// -------------------
/// src mac = 00:11:22:33:44:55
/// dst mac = 66:77:88:99:aa:bb
/// src ip = 192.168.0.1
/// dst ip = 10.0.0.1
/// src port = 80
/// dst port = 51234
/// Payload(Data) = 0x48 0x54 0x54 0x50
/// ```
///
/// Other events are not written, but logged: skips at `debug` level, malformed
/// frames and warnings at `warn` level.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> TextSink<W> {
        TextSink { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_record(&mut self, record: &DecodedRecord) -> io::Result<()> {
        let out = &mut self.out;
        writeln!(out, "-------------------")?;
        writeln!(out, "src mac = {}", record.source_mac())?;
        writeln!(out, "dst mac = {}", record.destination_mac())?;
        writeln!(out, "src ip = {}", record.source_addr())?;
        writeln!(out, "dst ip = {}", record.destination_addr())?;
        writeln!(out, "src port = {}", record.source_port())?;
        writeln!(out, "dst port = {}", record.destination_port())?;
        write!(out, "Payload(Data) = ")?;
        if record.payload.is_empty() {
            writeln!(out, "Empty")?;
        } else {
            for b in record.payload.as_bytes() {
                write!(out, "0x{:02x} ", b)?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn event(&mut self, event: Event<'_>) -> io::Result<()> {
        match event {
            Event::Decoded(record) => self.write_record(record)?,
            Event::Skipped(reason) => debug!(%reason, "frame skipped"),
            Event::Malformed(m) => warn!(malformation = %m, "malformed frame"),
            Event::Warning(msg) => warn!("capture error: {}", msg),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawFrame;
    use crate::decode::{decode_frame, FrameOutcome};
    use crate::ethernet::EtherType;
    use hex_literal::hex;

    // 00:11:22:33:44:55 -> 66:77:88:99:aa:bb, 192.168.0.1:80 -> 10.0.0.1:51234
    const FRAME: &[u8] = &hex!(
        "
66 77 88 99 aa bb 00 11 22 33 44 55 08 00 45 00
00 32 00 01 40 00 40 06 00 00 c0 a8 00 01 0a 00
00 01 00 50 c8 22 00 00 00 01 00 00 00 02 50 18
ff ff 00 00 00 00 48 54 54 50 2f 31 2e 31 20 32"
    );

    fn render(data: &[u8]) -> String {
        let record = match decode_frame(&RawFrame::new(data)) {
            FrameOutcome::Decoded(r) => r,
            other => panic!("unexpected outcome {:?}", other),
        };
        let mut sink = TextSink::new(Vec::new());
        sink.event(Event::Decoded(&record)).expect("write");
        String::from_utf8(sink.into_inner()).expect("utf8")
    }

    #[test]
    fn test_render_record() {
        let expected = "\
-------------------
src mac = 00:11:22:33:44:55
dst mac = 66:77:88:99:aa:bb
src ip = 192.168.0.1
dst ip = 10.0.0.1
src port = 80
dst port = 51234
Payload(Data) = 0x48 0x54 0x54 0x50 0x2f 0x31 0x2e 0x31 0x20 0x32 \n";
        assert_eq!(render(FRAME), expected);
    }

    #[test]
    fn test_render_empty_payload() {
        let text = render(&FRAME[..54]);
        assert!(text.ends_with("dst port = 51234\nPayload(Data) = Empty\n"));
    }

    #[test]
    fn test_other_events_not_written() {
        let mut sink = TextSink::new(Vec::new());
        sink.event(Event::Skipped(SkipReason::NonIpEthertype(EtherType::ARP)))
            .unwrap();
        sink.event(Event::Malformed(Malformation::TooShortForTcp))
            .unwrap();
        sink.event(Event::Warning("read error")).unwrap();
        assert!(sink.get_ref().is_empty());
    }

    #[test]
    fn test_write_error() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let record = match decode_frame(&RawFrame::new(FRAME)) {
            FrameOutcome::Decoded(r) => r,
            _ => unreachable!(),
        };
        let mut sink = TextSink::new(Closed);
        let err = sink.event(Event::Decoded(&record)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
