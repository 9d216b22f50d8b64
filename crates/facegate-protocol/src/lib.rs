//! Decision frame protocol spoken between the terminal and the door
//! controller.
//!
//! The protocol is one-way and minimal: each access attempt produces a single
//! frame telling the controller to release ([`Command::Accept`]) or stay locked
//! ([`Command::Reject`]).
//!
//! ```
//! use facegate_protocol::{decode, encode};
//!
//! let bytes = encode(0x01, b"Alice").unwrap();
//! assert_eq!(
//!     bytes.as_ref(),
//!     &[0xFF, 0x01, 0x05, 0x41, 0x6C, 0x69, 0x63, 0x65, 0xE4, 0xFE]
//! );
//!
//! let frame = decode(&bytes).unwrap();
//! assert_eq!(frame.command_code(), 0x01);
//! assert_eq!(frame.payload(), b"Alice");
//! ```

pub mod codec;
pub mod commands;
pub mod frame;
pub mod stream_parser;

pub use codec::FrameCodec;
pub use commands::Command;
pub use frame::{Frame, checksum, decode, encode, to_hex};
pub use stream_parser::{DrainFrames, StreamParser};
