use crate::commands::Command;
use bytes::{BufMut, Bytes, BytesMut};
use facegate_core::{
    Error, FormatError, Identity, Result,
    constants::{END_BYTE, FRAME_OVERHEAD, MAX_PAYLOAD_LEN, START_BYTE},
};
use std::fmt;

/// Bytes before the payload: SOF, CMD, LEN.
const HEADER_LEN: usize = 3;

/// A single decision frame.
///
/// # Wire Format
///
/// ```text
/// FF  CMD  LEN  PAYLOAD...  CHECKSUM  FE
/// ```
///
/// `CHECKSUM` is the 8-bit truncated sum of `CMD`, `LEN` and every payload
/// byte. Payload bytes are not escaped: a name containing `0xFF` or `0xFE`
/// goes on the wire verbatim. [`decode`] is length-driven and handles that
/// fine, but a receiver hunting for `0xFF` after line noise can lock onto such
/// a byte.
///
/// # Example
///
/// ```
/// use facegate_protocol::{Command, Frame};
///
/// let frame = Frame::new(Command::Accept, "bob").unwrap();
/// assert_eq!(frame.len(), 3);
/// assert_eq!(frame.checksum(), 0x37); // (0x01 + 0x03 + 'b' + 'o' + 'b') mod 256
/// assert_eq!(frame.to_bytes().len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    payload: Bytes,
}

impl Frame {
    /// Build a frame.
    ///
    /// `Command::Other` carrying a known code is stored as that command, so
    /// the frame equals what [`decode`] yields for its bytes.
    ///
    /// # Errors
    /// Returns `Error::PayloadTooLarge` if the payload exceeds 255 bytes.
    pub fn new(command: impl Into<Command>, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        Ok(Frame {
            command: Command::from(command.into().code()),
            payload,
        })
    }

    /// Frame telling the controller to stay locked.
    pub fn reject() -> Self {
        Frame {
            command: Command::Reject,
            payload: Bytes::new(),
        }
    }

    /// Frame telling the controller to release, naming who was let in.
    ///
    /// Infallible: an [`Identity`] never exceeds the payload limit.
    pub fn accept(identity: &Identity) -> Self {
        Frame {
            command: Command::Accept,
            payload: Bytes::copy_from_slice(identity.as_bytes()),
        }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn command_code(&self) -> u8 {
        self.command.code()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value of the LEN byte.
    pub fn len(&self) -> u8 {
        // Bounded by the constructor.
        self.payload.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn checksum(&self) -> u8 {
        checksum(self.command_code(), &self.payload)
    }

    /// Payload as text, when it is valid UTF-8.
    pub fn payload_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Size of the frame on the wire.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    /// Append the wire bytes of this frame to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        dst.put_u8(START_BYTE);
        dst.put_u8(self.command_code());
        dst.put_u8(self.len());
        dst.put_slice(&self.payload);
        dst.put_u8(self.checksum());
        dst.put_u8(END_BYTE);
    }

    /// Wire bytes of this frame.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parse the first frame that starts at or after the beginning of `src`.
    ///
    /// Leading bytes before the first `0xFF` are skipped. On success returns
    /// the frame and the number of bytes consumed, garbage included.
    ///
    /// # Errors
    /// Returns a [`FormatError`] describing why the candidate is not a frame.
    /// `Truncated` means more bytes may complete it.
    pub fn parse_prefix(src: &[u8]) -> std::result::Result<(Frame, usize), FormatError> {
        let start = src
            .iter()
            .position(|&b| b == START_BYTE)
            .ok_or(FormatError::MissingStart)?;
        let candidate = &src[start..];

        if candidate.len() < HEADER_LEN {
            return Err(FormatError::Truncated {
                needed: HEADER_LEN,
                available: candidate.len(),
            });
        }

        let command = candidate[1];
        let len = candidate[2] as usize;
        let total = HEADER_LEN + len + 2;

        if candidate.len() < total {
            return Err(FormatError::Truncated {
                needed: total,
                available: candidate.len(),
            });
        }

        let payload = &candidate[HEADER_LEN..HEADER_LEN + len];
        let expected = checksum(command, payload);
        let actual = candidate[HEADER_LEN + len];
        if actual != expected {
            return Err(FormatError::ChecksumMismatch { expected, actual });
        }

        let end = candidate[total - 1];
        if end != END_BYTE {
            return Err(FormatError::MissingEnd { found: end });
        }

        let frame = Frame {
            command: Command::from(command),
            payload: Bytes::copy_from_slice(payload),
        };
        Ok((frame, start + total))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.command, self.payload_text()) {
            (Command::Reject, _) => write!(f, "REJECT"),
            (command, Some(text)) if !text.is_empty() => write!(f, "{command} \"{text}\""),
            (command, _) if self.payload.is_empty() => write!(f, "{command}"),
            (command, _) => write!(f, "{command} [{}]", to_hex(&self.payload)),
        }
    }
}

/// 8-bit truncated sum over command, length and payload.
pub fn checksum(command: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(command.wrapping_add(payload.len() as u8), |acc, &b| {
            acc.wrapping_add(b)
        })
}

/// Encode a frame from its raw command code and payload.
///
/// # Errors
/// Returns `Error::PayloadTooLarge` if `payload` is longer than 255 bytes.
pub fn encode(command: u8, payload: &[u8]) -> Result<Bytes> {
    Frame::new(command, Bytes::copy_from_slice(payload)).map(|frame| frame.to_bytes())
}

/// Decode the first frame in `src`.
///
/// Bytes after the end marker are ignored. Any structural problem is reported
/// as a [`FormatError`]; callers must discard the bytes and resynchronize
/// rather than trust partial data.
pub fn decode(src: &[u8]) -> std::result::Result<Frame, FormatError> {
    Frame::parse_prefix(src).map(|(frame, _)| frame)
}

/// Upper-case hex dump, bytes separated by spaces.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
