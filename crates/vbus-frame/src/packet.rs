use std::fmt;

use bytes::Bytes;

use crate::codec::Header;

/// A fully validated vbus packet.
///
/// Produced only when the header and every frame passed their checksums.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    pub destination: u16,
    pub source: u16,
    pub protocol_revision: u8,
    pub command: u16,
    /// Number of frames the payload was carried in.
    pub frame_count: u8,
    /// Reconstructed 8-bit payload, `frame_count * 4` bytes.
    pub payload: Bytes,
}

impl Packet {
    /// Assemble a packet from its header and reconstructed payload.
    pub fn new(header: Header, payload: impl Into<Bytes>) -> Self {
        Self {
            destination: header.destination,
            source: header.source,
            protocol_revision: header.protocol_revision,
            command: header.command,
            frame_count: header.frame_count,
            payload: payload.into(),
        }
    }

    /// The header fields of this packet.
    pub fn header(&self) -> Header {
        Header {
            destination: self.destination,
            source: self.source,
            protocol_revision: self.protocol_revision,
            command: self.command,
            frame_count: self.frame_count,
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("destination", &format_args!("0x{:04X}", self.destination))
            .field("source", &format_args!("0x{:04X}", self.source))
            .field("protocol_revision", &format_args!("0x{:02X}", self.protocol_revision))
            .field("command", &format_args!("0x{:04X}", self.command))
            .field("frame_count", &self.frame_count)
            .field("payload", &format_args!("{:02X?}", self.payload.as_ref()))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04X} -> 0x{:04X} proto=0x{:02X} cmd=0x{:04X} len={}",
            self.source,
            self.destination,
            self.protocol_revision,
            self.command,
            self.payload.len()
        )
    }
}
