//! Stream parser for decision frames.
//!
//! Serial reads arrive in arbitrary chunks: half a frame, several frames, or
//! line noise. [`StreamParser`] accumulates bytes and hands out complete
//! frames as they become available.
//!
//! # Resynchronization
//!
//! ```text
//! ┌─────────────┐  0xFF found   ┌──────────────┐  LEN+5 bytes  ┌──────────────┐
//! │ Scanning    │──────────────>│ Candidate    │──────────────>│ Validate     │
//! └─────────────┘               └──────────────┘               └──────────────┘
//!       ^  │ other bytes              │ fewer bytes                │     │
//!       │  │ (discarded)              │ (wait for more)            │ ok  │ bad
//!       │  └──────────┘               └──────────┘                 │     │
//!       │                                                          v     v
//!       └──────────────────────────────────── frame out / error out, drop SOF
//! ```
//!
//! When a candidate fails its checksum or end-marker check the parser reports
//! the error, drops only the `0xFF` it locked onto, and resumes scanning from
//! the following byte. A genuine frame hiding right after the bad one is
//! therefore still found.
//!
//! # Example
//!
//! ```
//! use facegate_protocol::{Command, StreamParser, encode};
//!
//! let wire = encode(0x01, b"bob").unwrap();
//!
//! let mut parser = StreamParser::new();
//! parser.feed(&wire[..4]);
//! assert!(parser.next_frame().is_none());
//!
//! parser.feed(&wire[4..]);
//! let frame = parser.next_frame().unwrap().unwrap();
//! assert_eq!(frame.command(), Command::Accept);
//! ```

use bytes::{Buf, BytesMut};
use facegate_core::{
    FormatError,
    constants::{MAX_FRAME_LEN, START_BYTE},
};

use crate::frame::Frame;

/// Initial buffer capacity, enough for two maximum-size frames.
const INITIAL_BUFFER_CAPACITY: usize = 2 * MAX_FRAME_LEN;

/// Stateful parser turning a byte stream into frames.
#[derive(Debug)]
pub struct StreamParser {
    buffer: BytesMut,

    /// Malformed candidates dropped since creation.
    discarded: u64,
}

impl StreamParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            discarded: 0,
        }
    }

    /// Append bytes read from the link.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Extract the next frame, if one is complete.
    ///
    /// Returns:
    /// - `Some(Ok(frame))` - a valid frame was removed from the buffer
    /// - `Some(Err(e))` - a malformed candidate was dropped; call again to
    ///   keep scanning
    /// - `None` - nothing complete yet
    pub fn next_frame(&mut self) -> Option<Result<Frame, FormatError>> {
        match Frame::parse_prefix(&self.buffer) {
            Ok((frame, consumed)) => {
                self.buffer.advance(consumed);
                Some(Ok(frame))
            }
            Err(FormatError::MissingStart) => {
                // Nothing in here can ever start a frame.
                self.buffer.clear();
                None
            }
            Err(FormatError::Truncated { .. }) => {
                self.skip_to_start();
                None
            }
            Err(error) => {
                self.skip_to_start();
                self.buffer.advance(1);
                self.discarded += 1;
                Some(Err(error))
            }
        }
    }

    /// Iterate over every complete frame currently buffered.
    ///
    /// Malformed candidates are yielded as errors and do not end iteration.
    pub fn drain(&mut self) -> DrainFrames<'_> {
        DrainFrames { parser: self }
    }

    /// Bytes buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of malformed candidates dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Forget everything buffered.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn skip_to_start(&mut self) {
        if let Some(start) = self.buffer.iter().position(|&b| b == START_BYTE) {
            self.buffer.advance(start);
        }
    }
}

impl Default for StreamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`StreamParser::drain`].
pub struct DrainFrames<'a> {
    parser: &'a mut StreamParser,
}

impl Iterator for DrainFrames<'_> {
    type Item = Result<Frame, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, encode};

    #[test]
    fn test_single_frame() {
        let mut parser = StreamParser::new();
        parser.feed(&encode(0x00, b"").unwrap());

        let frame = parser.next_frame().unwrap().unwrap();
        assert_eq!(frame.command(), Command::Reject);
        assert_eq!(parser.buffered(), 0);
        assert!(parser.next_frame().is_none());
    }

    #[test]
    fn test_byte_by_byte() {
        let wire = encode(0x01, b"alice").unwrap();
        let mut parser = StreamParser::new();

        for &b in &wire[..wire.len() - 1] {
            parser.feed(&[b]);
            assert!(parser.next_frame().is_none());
        }
        parser.feed(&wire[wire.len() - 1..]);

        let frame = parser.next_frame().unwrap().unwrap();
        assert_eq!(frame.payload(), b"alice");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut chunk = encode(0x01, b"a").unwrap().to_vec();
        chunk.extend_from_slice(&encode(0x00, b"").unwrap());
        chunk.extend_from_slice(&encode(0x01, b"b").unwrap());

        let mut parser = StreamParser::new();
        parser.feed(&chunk);

        let frames: Vec<_> = parser.drain().collect::<Result<_, _>>().unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].payload(), b"b");
    }

    #[test]
    fn test_garbage_is_discarded() {
        let mut parser = StreamParser::new();
        parser.feed(b"noise without markers");
        assert!(parser.next_frame().is_none());
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_resync_after_bad_checksum() {
        let mut wire = vec![0xFF, 0x01, 0x01, b'x', 0x00, 0xFE]; // bad checksum
        wire.extend_from_slice(&encode(0x01, b"bob").unwrap());

        let mut parser = StreamParser::new();
        parser.feed(&wire);

        let first = parser.next_frame().unwrap();
        assert!(matches!(first, Err(FormatError::ChecksumMismatch { .. })));

        let second = parser.next_frame().unwrap().unwrap();
        assert_eq!(second.payload(), b"bob");
        assert_eq!(parser.discarded(), 1);
    }

    #[test]
    fn test_resync_after_missing_end() {
        let mut wire = vec![0xFF, 0x00, 0x00, 0x00, 0x00]; // EOF replaced by 0x00
        wire.extend_from_slice(&encode(0x00, b"").unwrap());

        let mut parser = StreamParser::new();
        parser.feed(&wire);

        assert!(matches!(
            parser.next_frame(),
            Some(Err(FormatError::MissingEnd { found: 0x00 }))
        ));
        assert_eq!(parser.next_frame().unwrap().unwrap(), Frame::reject());
    }

    #[test]
    fn test_marker_inside_payload_after_corruption() {
        // The accept frame below carries 0xFF in its name. If its header is
        // lost, the receiver locks onto that payload byte instead.
        let wire = encode(0x01, &[b'a', 0xFF, 0x00, 0x00, 0x00, 0xFE]).unwrap();
        let mut parser = StreamParser::new();
        parser.feed(&wire[1..]); // SOF lost on the line

        // 0xFF 00 00 00 FE inside the payload reads as a complete reject.
        let spurious = parser.next_frame().unwrap().unwrap();
        assert_eq!(spurious, Frame::reject());
    }

    #[test]
    fn test_reset() {
        let mut parser = StreamParser::new();
        parser.feed(&[0xFF, 0x01]);
        parser.reset();
        assert_eq!(parser.buffered(), 0);
    }
}
