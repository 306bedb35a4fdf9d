use std::fmt;

/// Which wire unit a framing anomaly was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// The 9-byte header following the marker.
    Header,
    /// A 6-byte data frame, numbered from 0.
    Frame(u8),
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Header => write!(f, "header"),
            Span::Frame(index) => write!(f, "frame {index}"),
        }
    }
}

/// Errors that can occur while decoding or encoding vbus packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The trailing checksum byte does not match the bytes before it.
    #[error("{span} checksum mismatch (expected 0x{expected:02X}, received 0x{received:02X})")]
    ChecksumMismatch {
        span: Span,
        expected: u8,
        received: u8,
    },

    /// A byte with the top bit set appeared inside a header or frame.
    #[error("{span} byte {offset} has the top bit set (0x{byte:02X})")]
    UnexpectedHighBit { span: Span, offset: usize, byte: u8 },

    /// A header field cannot be put on the wire without setting a top bit.
    #[error("{field} value 0x{value:04X} is not 7-bit clean")]
    FieldNotWireClean { field: &'static str, value: u16 },

    /// The payload length does not match `frame_count * 4`.
    #[error("payload length {actual} does not match frame count (expected {expected})")]
    PayloadLength { expected: usize, actual: usize },

    /// An I/O error occurred while reading the byte stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream ended.
    #[error("connection closed (end of stream)")]
    ConnectionClosed,
}

impl FrameError {
    /// Framing anomalies the reader recovers from by resuming the marker hunt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::UnexpectedHighBit { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
