use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result, Span};
use crate::packet::Packet;

/// Start-of-packet marker. The only byte on the wire with the top bit set.
pub const MARKER: u8 = 0xAA;

/// Header: dst (2) + src (2) + protocol (1) + command (2) + frame count (1) + checksum (1).
pub const HEADER_SIZE: usize = 9;

/// Frame: 4 low-7-bit payload bytes + top-bit map + checksum.
pub const FRAME_SIZE: usize = 6;

/// Logical payload bytes carried by one frame.
pub const FRAME_PAYLOAD: usize = 4;

/// The bit reserved for the marker.
pub const HIGH_BIT: u8 = 0x80;

/// Largest frame count a wire-clean header can carry.
pub const MAX_FRAMES: u8 = 0x7F;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub destination: u16,
    pub source: u16,
    pub protocol_revision: u8,
    pub command: u16,
    /// Number of 6-byte frames following the header.
    pub frame_count: u8,
}

impl Header {
    /// Logical payload length announced by this header.
    pub fn payload_len(&self) -> usize {
        self.frame_count as usize * FRAME_PAYLOAD
    }
}

/// Whether `byte` is usable inside a header or frame.
#[inline]
pub fn is_wire_clean(byte: u8) -> bool {
    byte & HIGH_BIT == 0
}

/// Checksum of `bytes`: 8-bit sum, negated, top bit cleared.
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    !sum & 0x7F
}

/// Verify the trailing checksum byte of a header or frame span.
pub fn checksum_ok(span: &[u8]) -> bool {
    match span.split_last() {
        Some((received, data)) => checksum(data) == *received,
        None => false,
    }
}

fn verify(span: Span, bytes: &[u8]) -> Result<()> {
    let (received, data) = match bytes.split_last() {
        Some((received, data)) => (*received, data),
        None => (0, bytes),
    };
    let expected = checksum(data);
    if expected == received && !bytes.is_empty() {
        return Ok(());
    }
    Err(FrameError::ChecksumMismatch {
        span,
        expected,
        received,
    })
}

/// Decode a header span.
///
/// Callers are expected to have rejected bytes with the top bit set; header
/// fields carry no top-bit reconstruction.
pub fn decode_header(buf: &[u8; HEADER_SIZE]) -> Result<Header> {
    verify(Span::Header, buf)?;
    Ok(Header {
        destination: u16::from_le_bytes([buf[0], buf[1]]),
        source: u16::from_le_bytes([buf[2], buf[3]]),
        protocol_revision: buf[4],
        command: u16::from_le_bytes([buf[5], buf[6]]),
        frame_count: buf[7],
    })
}

/// Decode one frame into its four logical payload bytes.
///
/// Byte 4 is a map whose bit `i` is the top bit of payload byte `i`; bits 4-7
/// are ignored.
pub fn decode_frame(index: u8, buf: &[u8; FRAME_SIZE]) -> Result<[u8; FRAME_PAYLOAD]> {
    verify(Span::Frame(index), buf)?;
    let map = buf[4];
    let mut out = [0u8; FRAME_PAYLOAD];
    for (i, byte) in out.iter_mut().enumerate() {
        let top = if map & (1 << i) != 0 { HIGH_BIT } else { 0 };
        *byte = buf[i] | top;
    }
    Ok(out)
}

/// Encode a header span, checksum included.
pub fn encode_header(header: &Header) -> Result<[u8; HEADER_SIZE]> {
    check_u16("destination", header.destination)?;
    check_u16("source", header.source)?;
    check_u8("protocol_revision", header.protocol_revision)?;
    check_u16("command", header.command)?;
    if header.frame_count > MAX_FRAMES {
        return Err(FrameError::FieldNotWireClean {
            field: "frame_count",
            value: header.frame_count as u16,
        });
    }

    let [dst_lo, dst_hi] = header.destination.to_le_bytes();
    let [src_lo, src_hi] = header.source.to_le_bytes();
    let [cmd_lo, cmd_hi] = header.command.to_le_bytes();
    let mut buf = [
        dst_lo,
        dst_hi,
        src_lo,
        src_hi,
        header.protocol_revision,
        cmd_lo,
        cmd_hi,
        header.frame_count,
        0,
    ];
    buf[HEADER_SIZE - 1] = checksum(&buf[..HEADER_SIZE - 1]);
    Ok(buf)
}

/// Encode four logical bytes into a wire-clean frame.
pub fn encode_frame(data: [u8; FRAME_PAYLOAD]) -> [u8; FRAME_SIZE] {
    let mut buf = [0u8; FRAME_SIZE];
    for (i, byte) in data.iter().enumerate() {
        buf[i] = byte & !HIGH_BIT;
        if byte & HIGH_BIT != 0 {
            buf[4] |= 1 << i;
        }
    }
    buf[FRAME_SIZE - 1] = checksum(&buf[..FRAME_SIZE - 1]);
    buf
}

/// Encode a complete packet (marker, header, frames) into `dst`.
///
/// This is the inverse of the decoders and is used to build captures and
/// test streams; the payload length must equal `frame_count * 4`.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────────────────────────────────────────┬──────────────────────┐
/// │ 0xAA │ dst.lo dst.hi src.lo src.hi proto cmd.lo      │ frame_count x        │
/// │      │ cmd.hi frame_count checksum                   │ b0 b1 b2 b3 map csum │
/// └──────┴──────────────────────────────────────────────┴──────────────────────┘
/// ```
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    let header = packet.header();
    if packet.payload.len() != header.payload_len() {
        return Err(FrameError::PayloadLength {
            expected: header.payload_len(),
            actual: packet.payload.len(),
        });
    }
    let head = encode_header(&header)?;

    dst.reserve(1 + HEADER_SIZE + header.frame_count as usize * FRAME_SIZE);
    dst.put_u8(MARKER);
    dst.put_slice(&head);
    for chunk in packet.payload.chunks_exact(FRAME_PAYLOAD) {
        let data = [chunk[0], chunk[1], chunk[2], chunk[3]];
        dst.put_slice(&encode_frame(data));
    }
    Ok(())
}

fn check_u8(field: &'static str, value: u8) -> Result<()> {
    if is_wire_clean(value) {
        Ok(())
    } else {
        Err(FrameError::FieldNotWireClean {
            field,
            value: value as u16,
        })
    }
}

fn check_u16(field: &'static str, value: u16) -> Result<()> {
    if value & 0x8080 == 0 {
        Ok(())
    } else {
        Err(FrameError::FieldNotWireClean { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;

    const SAMPLE_HEADER: [u8; HEADER_SIZE] =
        [0x34, 0x12, 0x00, 0x00, 0x01, 0x10, 0x00, 0x02, 0x26];

    #[test]
    fn checksum_is_negated_sum_without_top_bit() {
        assert_eq!(checksum(&[]), 0x7F);
        assert_eq!(checksum(&[0x01]), 0x7E);
        // 0x7F + 0x7F + 0x02 wraps to 0x00.
        assert_eq!(checksum(&[0x7F, 0x7F, 0x02]), 0x7F);
        assert_eq!(checksum(&[0x34, 0x12, 0x00, 0x00, 0x01, 0x10, 0x00, 0x02]), 0x26);
    }

    #[test]
    fn checksum_ok_rejects_empty_span() {
        assert!(!checksum_ok(&[]));
        assert!(checksum_ok(&[0x7F]));
    }

    #[test]
    fn decode_header_layout() {
        let header = decode_header(&SAMPLE_HEADER).unwrap();
        assert_eq!(header.destination, 0x1234);
        assert_eq!(header.source, 0x0000);
        assert_eq!(header.protocol_revision, 1);
        assert_eq!(header.command, 0x0010);
        assert_eq!(header.frame_count, 2);
        assert_eq!(header.payload_len(), 8);
    }

    #[test]
    fn decode_header_bad_checksum() {
        let mut buf = SAMPLE_HEADER;
        buf[8] = 0x27;
        let err = decode_header(&buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                span: Span::Header,
                expected: 0x26,
                received: 0x27,
            }
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn decode_frame_merges_top_bits_bitwise() {
        // Map 0b0101: bytes 0 and 2 get their top bit back.
        let wire = [0x01, 0x7F, 0x00, 0x55, 0x05, 0x25];
        let data = decode_frame(0, &wire).unwrap();
        assert_eq!(data, [0x81, 0x7F, 0x80, 0x55]);
        // `(low | bit) ? 0x80 : 0` would collapse every byte to 0x80 or 0x00.
        assert_ne!(data, [0x80, 0x80, 0x80, 0x80]);
    }

    #[test]
    fn decode_frame_ignores_upper_map_bits() {
        let mut wire = [0x10, 0x20, 0x30, 0x40, 0x70, 0x00];
        wire[5] = checksum(&wire[..5]);
        assert_eq!(decode_frame(0, &wire).unwrap(), [0x10, 0x20, 0x30, 0x40]);
    }

    #[test]
    fn decode_frame_bad_checksum_names_frame() {
        let mut wire = encode_frame([1, 2, 3, 4]);
        wire[5] ^= 0x01;
        let err = decode_frame(3, &wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                span: Span::Frame(3),
                ..
            }
        ));
    }

    #[test]
    fn encode_header_matches_sample() {
        let header = Header {
            destination: 0x1234,
            source: 0,
            protocol_revision: 1,
            command: 0x0010,
            frame_count: 2,
        };
        assert_eq!(encode_header(&header).unwrap(), SAMPLE_HEADER);
    }

    #[test]
    fn encode_header_rejects_dirty_fields() {
        let header = Header {
            destination: 0x0080,
            ..Header::default()
        };
        assert!(matches!(
            encode_header(&header),
            Err(FrameError::FieldNotWireClean {
                field: "destination",
                value: 0x0080
            })
        ));

        let header = Header {
            frame_count: 0x80,
            ..Header::default()
        };
        assert!(matches!(
            encode_header(&header),
            Err(FrameError::FieldNotWireClean {
                field: "frame_count",
                ..
            })
        ));
    }

    #[test]
    fn encode_header_frame_count_limit() {
        let header = Header {
            frame_count: MAX_FRAMES,
            ..Header::default()
        };
        let buf = encode_header(&header).unwrap();
        assert_eq!(decode_header(&buf).unwrap().frame_count, MAX_FRAMES);

        let header = Header {
            frame_count: MAX_FRAMES + 1,
            ..Header::default()
        };
        assert!(matches!(
            encode_header(&header),
            Err(FrameError::FieldNotWireClean {
                field: "frame_count",
                value: 0x80
            })
        ));
    }

    #[test]
    fn encode_packet_layout() {
        let header = Header {
            destination: 0x0010,
            source: 0x7E11,
            protocol_revision: 0x10,
            command: 0x0100,
            frame_count: 1,
        };
        let packet = Packet::new(header, Bytes::from_static(&[0xFF, 0x00, 0x80, 0x7F]));
        let mut wire = BytesMut::new();
        encode_packet(&packet, &mut wire).unwrap();

        assert_eq!(wire.len(), 1 + HEADER_SIZE + FRAME_SIZE);
        assert_eq!(wire[0], MARKER);
        assert!(wire[1..].iter().all(|b| is_wire_clean(*b)));
        assert_eq!(&wire[10..14], &[0x7F, 0x00, 0x00, 0x7F]);
        assert_eq!(wire[14], 0b0101);
    }

    #[test]
    fn encode_packet_rejects_length_mismatch() {
        let header = Header {
            frame_count: 2,
            ..Header::default()
        };
        let packet = Packet::new(header, Bytes::from_static(&[1, 2, 3, 4]));
        let err = encode_packet(&packet, &mut BytesMut::new()).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadLength {
                expected: 8,
                actual: 4
            }
        ));
        assert!(!err.is_transient());
    }

    proptest! {
        #[test]
        fn frame_reconstruction_formula(data in any::<[u8; 4]>()) {
            let wire = encode_frame(data);
            prop_assert!(wire.iter().all(|b| is_wire_clean(*b)));
            let decoded = decode_frame(0, &wire).unwrap();
            for i in 0..FRAME_PAYLOAD {
                let top = if wire[4] & (1 << i) != 0 { 0x80 } else { 0 };
                prop_assert_eq!(decoded[i], wire[i] | top);
            }
            prop_assert_eq!(decoded, data);
        }

        #[test]
        fn single_byte_mutation_breaks_header_checksum(
            fields in any::<[u8; 8]>(),
            index in 0usize..HEADER_SIZE,
            replacement in 0u8..0x80,
        ) {
            let mut buf = [0u8; HEADER_SIZE];
            for (dst, src) in buf.iter_mut().zip(fields.iter()) {
                *dst = src & 0x7F;
            }
            buf[8] = checksum(&buf[..8]);
            prop_assume!(buf[index] != replacement);

            // Top-bit flips are caught by the reader before the checksum runs,
            // so mutations stay inside the wire-clean range.
            buf[index] = replacement;
            prop_assert!(!checksum_ok(&buf));
        }

        #[test]
        fn single_byte_mutation_breaks_frame_checksum(
            data in any::<[u8; 4]>(),
            index in 0usize..FRAME_SIZE,
            replacement in 0u8..0x80,
        ) {
            let mut wire = encode_frame(data);
            prop_assume!(wire[index] != replacement);
            wire[index] = replacement;
            prop_assert!(!checksum_ok(&wire));
            prop_assert!(decode_frame(0, &wire).is_err());
        }
    }
}
