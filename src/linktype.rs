use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type of a capture, as reported by a pcap file header or
/// by libpcap for a live device. Only `ETHERNET` frames can be decoded.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    IEEE802_5 = 6,
    PPP = 9,
    FDDI = 10,

    RAW = 101,
    IEEE802_11 = 105,

    LOOP = 108,
    LINUX_SLL = 113,
    IEEE802_11_RADIOTAP = 127,

    IPV4 = 228,
    IPV6 = 229,
    NFLOG = 239,

    LINUX_SLL2 = 276,
}
}
