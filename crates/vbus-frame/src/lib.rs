//! Marker-synchronized packet framing for vbus.
//!
//! vbus is a half-duplex RS-485 style bus: the master talks, slaves answer
//! only when addressed. Every packet on the line is:
//! - a marker byte (0xAA), the only byte with its top bit set
//! - a 9-byte header with addressing, protocol revision, command and frame count
//! - `frame_count` 6-byte frames, each carrying 4 payload bytes whose top bits
//!   travel in a separate map byte
//!
//! Header and frames end in a checksum: the 8-bit sum of the preceding bytes,
//! negated, top bit cleared. [`PacketReader`] turns an unreliable byte stream
//! into validated [`Packet`]s, resynchronizing on the marker after any anomaly.

pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;

pub use codec::{
    checksum, checksum_ok, decode_frame, decode_header, encode_frame, encode_header,
    encode_packet, is_wire_clean, Header, FRAME_PAYLOAD, FRAME_SIZE, HEADER_SIZE, HIGH_BIT,
    MARKER, MAX_FRAMES,
};
pub use error::{FrameError, Result, Span};
pub use packet::Packet;
pub use reader::{PacketReader, ReaderState, ReaderStats};
