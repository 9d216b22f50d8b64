//! Tokio codec for decision frames.
//!
//! [`FrameCodec`] plugs the frame format into `tokio_util`'s `Framed`,
//! `FramedRead` and `FramedWrite` adapters so a receiver (the door controller
//! emulator, a bench monitor) can consume frames as a stream.
//!
//! # Architecture
//!
//! ```text
//! byte stream -> Decoder (StreamParser) -> Frame
//! Frame -> Encoder -> byte stream
//! ```
//!
//! # Error Handling
//!
//! `Framed` streams stop after the first decoder error. Malformed frames are
//! therefore not surfaced as errors here: the decoder logs them, counts them
//! and keeps scanning, so a noisy line never ends the stream. Use
//! [`StreamParser`] directly when every malformed candidate must be seen.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::{Frame, StreamParser};
use facegate_core::Error;

/// Codec turning a byte stream into [`Frame`]s and back.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::{Decoder, Encoder};
/// use facegate_protocol::{Frame, FrameCodec};
///
/// let mut codec = FrameCodec::new();
/// let mut wire = BytesMut::new();
/// codec.encode(Frame::reject(), &mut wire).unwrap();
///
/// let frame = codec.decode(&mut wire).unwrap().unwrap();
/// assert_eq!(frame, Frame::reject());
/// ```
#[derive(Debug, Default)]
pub struct FrameCodec {
    parser: StreamParser,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            parser: StreamParser::new(),
        }
    }

    /// Malformed frames skipped by the decoder so far.
    pub fn discarded(&self) -> u64 {
        self.parser.discarded()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            // The parser owns buffering from here on.
            self.parser.feed(src);
            src.clear();
        }

        loop {
            match self.parser.next_frame() {
                Some(Ok(frame)) => return Ok(Some(frame)),
                Some(Err(e)) => warn!("Discarding malformed frame: {}", e),
                None => return Ok(None),
            }
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}
