//! Replay of legacy pcap files
//!
//! See <https://wiki.wireshark.org/Development/LibpcapFileFormat> for details.
//!
//! [`PcapFileSource`] is a [`CaptureSource`] reading a legacy pcap file (or any
//! stream in that format) and handing its records to the decoder, the same way a
//! live capture would.

use crate::capture::{CaptureSource, NextFrame, RawFrame};
use crate::error::{CaptureError, PcapError};
use crate::linktype::Linktype;
use circular::Buffer;
use nom::bytes::streaming::take;
use nom::number::streaming::{be_i32, be_u16, be_u32, le_i32, le_u16, le_u32};
use nom::{IResult, Needed, Offset};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// Default capacity of the read buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 65536;

/// PCAP global header
#[derive(Clone, Debug)]
pub struct PcapHeader {
    /// File format and byte ordering. If equal to `0xa1b2c3d4` or `0xa1b23c4d` then the rest of
    /// the file uses native byte ordering. If `0xd4c3b2a1` or `0x4d3cb2a1` (swapped), then all
    /// following fields will have to be swapped too.
    pub magic_number: u32,
    /// Version major number (currently 2)
    pub version_major: u16,
    /// Version minor number (currently 4)
    pub version_minor: u16,
    /// The correction time in seconds between GMT (UTC) and the local timezone of the following packet header timestamps
    pub thiszone: i32,
    /// In theory, the accuracy of time stamps in the capture; in practice, all tools set it to 0
    pub sigfigs: u32,
    /// max len of captured packets, in octets
    pub snaplen: u32,
    /// Data link type
    pub network: Linktype,
}

impl PcapHeader {
    pub const fn size(&self) -> usize {
        24
    }

    pub fn is_bigendian(&self) -> bool {
        (self.magic_number & 0xFFFF) == 0xb2a1 // works for both nanosecond and microsecond resolution timestamps
    }

    pub fn is_modified_format(&self) -> bool {
        self.magic_number == 0xa1b2_cd34
    }

    pub fn is_nanosecond_precision(&self) -> bool {
        self.magic_number == 0xa1b2_3c4d || self.magic_number == 0x4d3c_b2a1
    }
}

fn parse_header_fields<'a, F16, F32, FI32>(
    i: &'a [u8],
    magic_number: u32,
    read_u16: F16,
    read_u32: F32,
    read_i32: FI32,
) -> IResult<&'a [u8], PcapHeader, PcapError>
where
    F16: Fn(&'a [u8]) -> IResult<&'a [u8], u16, PcapError>,
    F32: Fn(&'a [u8]) -> IResult<&'a [u8], u32, PcapError>,
    FI32: Fn(&'a [u8]) -> IResult<&'a [u8], i32, PcapError>,
{
    let (i, version_major) = read_u16(i)?;
    let (i, version_minor) = read_u16(i)?;
    let (i, thiszone) = read_i32(i)?;
    let (i, sigfigs) = read_u32(i)?;
    let (i, snaplen) = read_u32(i)?;
    let (i, network) = read_i32(i)?;
    let header = PcapHeader {
        magic_number,
        version_major,
        version_minor,
        thiszone,
        sigfigs,
        snaplen,
        network: Linktype(network),
    };
    Ok((i, header))
}

/// Read the PCAP global header
///
/// The magic number is read as little-endian, and selects the byte order of the
/// other fields.
pub fn parse_pcap_header(i: &[u8]) -> IResult<&[u8], PcapHeader, PcapError> {
    let (i, magic_number) = le_u32(i)?;
    match magic_number {
        0xa1b2_c3d4 | 0xa1b2_3c4d | 0xa1b2_cd34 => {
            parse_header_fields(i, magic_number, le_u16, le_u32, le_i32)
        }
        0xd4c3_b2a1 | 0x4d3c_b2a1 => {
            parse_header_fields(i, magic_number, be_u16, be_u32, be_i32)
        }
        _ => Err(nom::Err::Error(PcapError::HeaderNotRecognized)),
    }
}

/// A record of a legacy pcap file
#[derive(Debug)]
pub struct LegacyPcapRecord<'a> {
    pub ts_sec: u32,
    /// Microseconds, or nanoseconds for nanosecond-precision files
    pub ts_frac: u32,
    pub caplen: u32,
    pub origlen: u32,
    pub data: &'a [u8],
}

fn parse_record_with<'a, F>(
    i: &'a [u8],
    header_len: usize,
    read_u32: F,
) -> IResult<&'a [u8], LegacyPcapRecord<'a>, PcapError>
where
    F: Fn(&'a [u8]) -> IResult<&'a [u8], u32, PcapError>,
{
    if i.len() < header_len {
        return Err(nom::Err::Incomplete(Needed::new(header_len - i.len())));
    }
    let (i, ts_sec) = read_u32(i)?;
    let (i, ts_frac) = read_u32(i)?;
    let (i, caplen) = read_u32(i)?;
    let (i, origlen) = read_u32(i)?;
    let (i, _extra) = take(header_len - 16)(i)?;
    let (i, data) = take(caplen as usize)(i)?;
    let record = LegacyPcapRecord {
        ts_sec,
        ts_frac,
        caplen,
        origlen,
        data,
    };
    Ok((i, record))
}

/// Read a PCAP record header and data
///
/// Each PCAP record starts with a 16-byte header, and is followed by packet data.
pub fn parse_pcap_record(i: &[u8]) -> IResult<&[u8], LegacyPcapRecord, PcapError> {
    parse_record_with(i, 16, le_u32)
}

/// Read a PCAP record header and data (big-endian)
pub fn parse_pcap_record_be(i: &[u8]) -> IResult<&[u8], LegacyPcapRecord, PcapError> {
    parse_record_with(i, 16, be_u32)
}

/// Read a PCAP record header and data ("modified" pcap format)
///
/// Records of the modified format have a 24-byte header: the interface index,
/// protocol and packet type follow the lengths, and are ignored.
pub fn parse_pcap_record_modified(i: &[u8]) -> IResult<&[u8], LegacyPcapRecord, PcapError> {
    parse_record_with(i, 24, le_u32)
}

type RecordParseFn = fn(&[u8]) -> IResult<&[u8], LegacyPcapRecord, PcapError>;

/// Capture source replaying a legacy pcap file
///
/// This reader is a streaming parser based on a circular buffer, which means memory
/// usage is constant, and that it can be used to parse huge files or infinite streams.
/// The size of the circular buffer has to be big enough for at least one complete
/// record. Using a larger value (at least 65k) is advised to avoid frequent reads
/// and buffer shifts.
///
/// The file header is read when the source is created, and must announce Ethernet
/// frames. Each call to `next_frame` returns one record; the record is released
/// from the buffer on the following call.
///
/// ## Example
///
/// ```rust,no_run
/// use pcap_test::{CaptureSource, NextFrame, PcapFileSource};
///
/// let mut source = PcapFileSource::open("capture.pcap").expect("PcapFileSource");
/// loop {
///     match source.next_frame() {
///         NextFrame::Frame(frame) => println!("{} bytes", frame.caplen()),
///         NextFrame::NoDataYet | NextFrame::RecoverableError(_) => (),
///         NextFrame::TerminalError(e) => panic!("error while reading: {}", e),
///         NextFrame::StreamEnded => break,
///     }
/// }
/// source.close();
/// ```
pub struct PcapFileSource<R>
where
    R: Read,
{
    header: PcapHeader,
    reader: R,
    buffer: Buffer,
    consumed: usize,
    pending: usize,
    reader_exhausted: bool,
    closed: bool,
    parse: RecordParseFn,
}

impl PcapFileSource<File> {
    /// Opens a pcap file, with the default buffer capacity.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PcapFileSource<File>, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        info!(path = %path.display(), "replaying pcap file");
        PcapFileSource::new(DEFAULT_BUFFER_CAPACITY, file)
    }
}

impl<R> PcapFileSource<R>
where
    R: Read,
{
    /// Creates a new `PcapFileSource<R>` with the provided buffer capacity.
    pub fn new(capacity: usize, reader: R) -> Result<PcapFileSource<R>, CaptureError> {
        let buffer = Buffer::with_capacity(capacity);
        Self::from_buffer(buffer, reader)
    }

    /// Creates a new `PcapFileSource<R>` using the provided `Buffer`.
    pub fn from_buffer(mut buffer: Buffer, mut reader: R) -> Result<PcapFileSource<R>, CaptureError> {
        let mut reader_exhausted = false;
        while buffer.available_data() < 24 && !reader_exhausted {
            let sz = match reader.read(buffer.space()) {
                Ok(sz) => sz,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            reader_exhausted = sz == 0;
            buffer.fill(sz);
        }
        let header = match parse_pcap_header(buffer.data()) {
            Ok((_rem, h)) => h,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(e.into()),
            Err(nom::Err::Incomplete(_)) => return Err(CaptureError::IncompleteHeader),
        };
        if header.network != Linktype::ETHERNET {
            return Err(CaptureError::UnsupportedLinktype(header.network));
        }
        let parse: RecordParseFn = if header.is_modified_format() {
            parse_pcap_record_modified
        } else if header.is_bigendian() {
            parse_pcap_record_be
        } else {
            parse_pcap_record
        };
        debug!(
            version = %format!("{}.{}", header.version_major, header.version_minor),
            snaplen = header.snaplen,
            big_endian = header.is_bigendian(),
            "pcap header"
        );
        let size = header.size();
        buffer.consume(size);
        Ok(PcapFileSource {
            header,
            reader,
            buffer,
            consumed: size,
            pending: 0,
            reader_exhausted,
            closed: false,
            parse,
        })
    }

    /// The global header of the file
    pub fn header(&self) -> &PcapHeader {
        &self.header
    }

    /// Get the number of consumed bytes
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Returns true if underlying reader is exhausted
    ///
    /// Note that exhausted reader only means that next `refill` will not
    /// add any data, but there can still be data not consumed in the current buffer.
    pub fn reader_exhausted(&self) -> bool {
        self.reader_exhausted
    }

    fn refill(&mut self) -> io::Result<()> {
        self.buffer.shift();
        let space = self.buffer.space();
        // check if available space is empty, so we can distinguish
        // a read() returning 0 because of EOF or because we requested 0
        if space.is_empty() {
            return Ok(());
        }
        let sz = self.reader.read(space)?;
        self.reader_exhausted = sz == 0;
        self.buffer.fill(sz);
        Ok(())
    }

    /// Read until a complete record is at the start of the buffer, and return its
    /// length. Any other condition is returned as the `NextFrame` to report.
    fn fill_record(&mut self) -> Result<usize, NextFrame<'static>> {
        loop {
            if self.buffer.available_data() == 0 && self.reader_exhausted {
                return Err(NextFrame::StreamEnded);
            }
            let data = self.buffer.data();
            let needed = match (self.parse)(data) {
                Ok((rem, _)) => return Ok(data.offset(rem)),
                Err(nom::Err::Incomplete(n)) => n,
                Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                    return Err(NextFrame::TerminalError(format!(
                        "invalid pcap record at offset {}: {:?}",
                        self.consumed, e
                    )));
                }
            };
            if self.reader_exhausted {
                // expected more bytes but reader is EOF, truncated pcap?
                return Err(NextFrame::TerminalError(format!(
                    "truncated pcap record at offset {}",
                    self.consumed
                )));
            }
            if let Needed::Size(n) = needed {
                if self.buffer.available_data() + usize::from(n) > self.buffer.capacity() {
                    return Err(NextFrame::TerminalError(format!(
                        "pcap record at offset {} does not fit in a {} bytes buffer",
                        self.consumed,
                        self.buffer.capacity()
                    )));
                }
            }
            if let Err(e) = self.refill() {
                return Err(match e.kind() {
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => {
                        NextFrame::RecoverableError(e.to_string())
                    }
                    _ => NextFrame::TerminalError(e.to_string()),
                });
            }
        }
    }
}

impl<R> CaptureSource for PcapFileSource<R>
where
    R: Read,
{
    fn next_frame(&mut self) -> NextFrame<'_> {
        if self.closed {
            return NextFrame::StreamEnded;
        }
        if self.pending > 0 {
            self.consumed += self.pending;
            self.buffer.consume(self.pending);
            self.pending = 0;
        }
        let len = match self.fill_record() {
            Ok(len) => len,
            Err(next) => return next,
        };
        self.pending = len;
        let nanosecond = self.header.is_nanosecond_precision();
        match (self.parse)(self.buffer.data()) {
            Ok((_, record)) => NextFrame::Frame(RawFrame {
                ts_sec: record.ts_sec,
                ts_usec: if nanosecond {
                    record.ts_frac / 1000
                } else {
                    record.ts_frac
                },
                origlen: record.origlen,
                data: record.data,
            }),
            Err(_) => NextFrame::TerminalError(format!(
                "pcap record at offset {} could not be read back",
                self.consumed
            )),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            debug!(consumed = self.consumed, "pcap replay closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const HEADER_LE: [u8; 24] = hex!(
        "
d4 c3 b2 a1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 01 00 01 00 00 00"
    );
    const HEADER_BE: [u8; 24] = hex!(
        "
a1 b2 c3 d4 00 02 00 04 00 00 00 00 00 00 00 00
00 01 00 00 00 00 00 01"
    );
    const HEADER_NS: [u8; 24] = hex!(
        "
4d 3c b2 a1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 01 00 01 00 00 00"
    );
    const HEADER_MODIFIED: [u8; 24] = hex!(
        "
34 cd b2 a1 02 00 04 00 00 00 00 00 00 00 00 00
00 00 01 00 01 00 00 00"
    );

    #[derive(Debug, PartialEq)]
    enum End {
        Stream,
        Terminal(String),
    }

    type Frame = (u32, u32, u32, Vec<u8>);

    fn record(big_endian: bool, ts: (u32, u32), data: &[u8], origlen: u32) -> Vec<u8> {
        let fields = [ts.0, ts.1, data.len() as u32, origlen];
        let mut v = Vec::new();
        for f in fields.iter() {
            if big_endian {
                v.extend_from_slice(&f.to_be_bytes());
            } else {
                v.extend_from_slice(&f.to_le_bytes());
            }
        }
        v.extend_from_slice(data);
        v
    }

    fn collect<R: Read>(source: &mut PcapFileSource<R>) -> (Vec<Frame>, End) {
        let mut frames = Vec::new();
        loop {
            match source.next_frame() {
                NextFrame::Frame(f) => frames.push((f.ts_sec, f.ts_usec, f.origlen, f.data.to_vec())),
                NextFrame::NoDataYet => (),
                NextFrame::RecoverableError(e) => panic!("unexpected recoverable error: {}", e),
                NextFrame::TerminalError(e) => return (frames, End::Terminal(e)),
                NextFrame::StreamEnded => return (frames, End::Stream),
            }
        }
    }

    /// A reader returning one byte per call
    struct Trickle<'a>(&'a [u8]);

    impl<'a> Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_replay_le() {
        let mut file = HEADER_LE.to_vec();
        file.extend(record(false, (1, 500), b"first frame", 11));
        file.extend(record(false, (2, 999_999), b"second", 1514));
        let mut source = PcapFileSource::new(1024, &file[..]).expect("PcapFileSource");
        assert_eq!(source.header().network, Linktype::ETHERNET);
        assert_eq!(source.header().snaplen, 65536);
        assert!(!source.header().is_bigendian());
        let (frames, end) = collect(&mut source);
        assert_eq!(end, End::Stream);
        assert_eq!(
            frames,
            vec![
                (1, 500, 11, b"first frame".to_vec()),
                (2, 999_999, 1514, b"second".to_vec()),
            ]
        );
        assert_eq!(source.consumed(), file.len());
        assert!(source.reader_exhausted());
        assert!(matches!(source.next_frame(), NextFrame::StreamEnded));
    }

    #[test]
    fn test_signed_header_fields() {
        let mut le = HEADER_LE.to_vec();
        le[8..12].copy_from_slice(&(-3600i32).to_le_bytes());
        let (_, header) = parse_pcap_header(&le).expect("pcap header");
        assert_eq!(header.thiszone, -3600);
        assert_eq!(header.network, Linktype::ETHERNET);

        let mut be = HEADER_BE.to_vec();
        be[8..12].copy_from_slice(&(-3600i32).to_be_bytes());
        be[20..24].copy_from_slice(&(-1i32).to_be_bytes());
        let (_, header) = parse_pcap_header(&be).expect("pcap header");
        assert_eq!(header.thiszone, -3600);
        assert_eq!(header.network, Linktype(-1));
    }

    #[test]
    fn test_replay_be() {
        let mut file = HEADER_BE.to_vec();
        file.extend(record(true, (0x0102_0304, 7), b"big endian", 60));
        let mut source = PcapFileSource::new(1024, &file[..]).unwrap();
        assert!(source.header().is_bigendian());
        let (frames, end) = collect(&mut source);
        assert_eq!(end, End::Stream);
        assert_eq!(frames, vec![(0x0102_0304, 7, 60, b"big endian".to_vec())]);
    }

    #[test]
    fn test_replay_nanosecond() {
        let mut file = HEADER_NS.to_vec();
        file.extend(record(false, (10, 123_456_789), b"ns", 2));
        let mut source = PcapFileSource::new(1024, &file[..]).unwrap();
        assert!(source.header().is_nanosecond_precision());
        let (frames, _) = collect(&mut source);
        assert_eq!(frames[0].1, 123_456);
    }

    #[test]
    fn test_replay_modified_format() {
        let mut file = HEADER_MODIFIED.to_vec();
        let mut rec = record(false, (3, 4), &[], 5);
        // caplen, then 8 bytes of interface index / protocol / packet type
        rec[8..12].copy_from_slice(&5u32.to_le_bytes());
        rec.extend_from_slice(&hex!("02 00 00 00 08 00 00 00"));
        rec.extend_from_slice(b"hello");
        file.extend(rec);
        let mut source = PcapFileSource::new(1024, &file[..]).unwrap();
        assert!(source.header().is_modified_format());
        let (frames, end) = collect(&mut source);
        assert_eq!(end, End::Stream);
        assert_eq!(frames, vec![(3, 4, 5, b"hello".to_vec())]);
    }

    #[test]
    fn test_replay_small_reads() {
        let payload = [0x5au8; 60];
        let mut file = HEADER_LE.to_vec();
        for n in 0..10 {
            file.extend(record(false, (n, 0), &payload, 60));
        }
        let mut source = PcapFileSource::new(128, Trickle(&file)).unwrap();
        let (frames, end) = collect(&mut source);
        assert_eq!(end, End::Stream);
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().all(|f| f.3 == payload));
        assert_eq!(frames[9].0, 9);
    }

    #[test]
    fn test_truncated_pcap() {
        let mut file = HEADER_LE.to_vec();
        file.extend(record(false, (1, 0), b"complete", 8));
        file.extend(record(false, (2, 0), b"cut short", 9));
        file.truncate(file.len() - 3);
        let mut source = PcapFileSource::new(1024, &file[..]).unwrap();
        let (frames, end) = collect(&mut source);
        assert_eq!(frames.len(), 1);
        assert!(matches!(end, End::Terminal(ref e) if e.contains("truncated")));
    }

    #[test]
    fn test_record_larger_than_buffer() {
        let mut file = HEADER_LE.to_vec();
        file.extend(record(false, (1, 0), &[0u8; 200], 200));
        let mut source = PcapFileSource::new(64, &file[..]).unwrap();
        let (frames, end) = collect(&mut source);
        assert!(frames.is_empty());
        assert!(matches!(end, End::Terminal(ref e) if e.contains("does not fit")));
    }

    #[test]
    fn test_unsupported_linktype() {
        let mut file = HEADER_LE.to_vec();
        file[20..24].copy_from_slice(&113i32.to_le_bytes());
        let res = PcapFileSource::new(1024, &file[..]);
        assert!(matches!(
            res,
            Err(CaptureError::UnsupportedLinktype(Linktype::LINUX_SLL))
        ));
    }

    #[test]
    fn test_header_not_recognized() {
        let file = [0u8; 24];
        let res = PcapFileSource::new(1024, &file[..]);
        assert!(matches!(res, Err(CaptureError::HeaderNotRecognized)));
    }

    #[test]
    fn test_empty_reader() {
        let empty: &[u8] = &[];
        let res = PcapFileSource::new(1024, empty);
        assert!(matches!(res, Err(CaptureError::IncompleteHeader)));
    }

    #[test]
    fn test_close() {
        let mut file = HEADER_LE.to_vec();
        file.extend(record(false, (1, 0), b"never read", 10));
        let mut source = PcapFileSource::new(1024, &file[..]).unwrap();
        source.close();
        assert!(matches!(source.next_frame(), NextFrame::StreamEnded));
    }
}
