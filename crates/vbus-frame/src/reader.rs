use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{decode_frame, decode_header, is_wire_clean, FRAME_SIZE, HEADER_SIZE, MARKER};
use crate::error::{FrameError, Result, Span};
use crate::packet::Packet;

/// Where the reader is in the packet grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Scanning for the next marker byte.
    Hunting,
    /// Collecting the 9 header bytes after a marker.
    ReadingHeader,
    /// Collecting the frames announced by the header.
    ReadingFrames,
    /// A complete packet has been handed out.
    Delivering,
}

/// Running counters for a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Packets delivered.
    pub packets: u64,
    /// Bytes consumed from the stream.
    pub bytes_read: u64,
    /// Bytes discarded while hunting for a marker.
    pub bytes_skipped: u64,
    /// Packets dropped on a header or frame checksum mismatch.
    pub checksum_failures: u64,
    /// Packets dropped because a top-bit byte appeared inside them.
    pub marker_aborts: u64,
}

/// Reads validated packets from any `Read` stream.
///
/// Bytes are pulled one at a time. Any framing anomaly discards the packet in
/// progress and the reader goes back to hunting for a marker; callers only
/// ever see complete packets or a fatal stream error.
pub struct PacketReader<T> {
    inner: T,
    state: ReaderState,
    stats: ReaderStats,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            state: ReaderState::Hunting,
            stats: ReaderStats::default(),
        }
    }

    /// Read the next valid packet (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at end of stream and
    /// `Err(FrameError::Io)` on a read failure. Framing errors never surface.
    pub fn read_packet(&mut self) -> Result<Packet> {
        loop {
            self.enter(ReaderState::Hunting);
            self.hunt()?;

            match self.read_body() {
                Ok(packet) => {
                    self.enter(ReaderState::Delivering);
                    self.stats.packets += 1;
                    return Ok(packet);
                }
                Err(err) if err.is_transient() => {
                    match err {
                        FrameError::ChecksumMismatch { .. } => self.stats.checksum_failures += 1,
                        _ => self.stats.marker_aborts += 1,
                    }
                    debug!(error = %err, "discarding packet, resynchronizing");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Current position in the packet grammar.
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Counters accumulated since the reader was created.
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn enter(&mut self, state: ReaderState) {
        if self.state != state {
            trace!(from = ?self.state, to = ?state, "reader state");
            self.state = state;
        }
    }

    fn hunt(&mut self) -> Result<()> {
        loop {
            if self.read_byte()? == MARKER {
                return Ok(());
            }
            self.stats.bytes_skipped += 1;
        }
    }

    fn read_body(&mut self) -> Result<Packet> {
        self.enter(ReaderState::ReadingHeader);
        let mut head = [0u8; HEADER_SIZE];
        self.read_span(Span::Header, &mut head)?;
        let header = decode_header(&head)?;

        let mut payload = BytesMut::with_capacity(header.payload_len());
        if header.frame_count > 0 {
            self.enter(ReaderState::ReadingFrames);
        }
        for index in 0..header.frame_count {
            let mut wire = [0u8; FRAME_SIZE];
            self.read_span(Span::Frame(index), &mut wire)?;
            payload.extend_from_slice(&decode_frame(index, &wire)?);
        }

        Ok(Packet::new(header, payload.freeze()))
    }

    /// Fill `buf`, abandoning on the first byte with the top bit set.
    ///
    /// The offending byte is consumed; it is not reconsidered as a marker.
    fn read_span(&mut self, span: Span, buf: &mut [u8]) -> Result<()> {
        for (offset, slot) in buf.iter_mut().enumerate() {
            let byte = self.read_byte()?;
            if !is_wire_clean(byte) {
                return Err(FrameError::UnexpectedHighBit { span, offset, byte });
            }
            *slot = byte;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(_) => {
                    self.stats.bytes_read += 1;
                    return Ok(byte[0]);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

impl<T> std::fmt::Debug for PacketReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketReader")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
