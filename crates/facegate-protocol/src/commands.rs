use facegate_core::constants::{CMD_ACCEPT, CMD_REJECT};
use std::fmt;

/// Command byte of a decision frame.
///
/// Only reject and accept are defined today. Any other code is carried as
/// [`Command::Other`] so newer controllers can extend the protocol without
/// older receivers treating the frame as corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// `0x00`: keep the door locked. Empty payload.
    Reject,

    /// `0x01`: release the door. Payload is the UTF-8 identity name.
    Accept,

    /// Any code this build does not know about.
    Other(u8),
}

impl Command {
    /// Wire value of this command.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Reject => CMD_REJECT,
            Self::Accept => CMD_ACCEPT,
            Self::Other(code) => code,
        }
    }

    /// Whether this build understands the command.
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        match code {
            CMD_REJECT => Self::Reject,
            CMD_ACCEPT => Self::Accept,
            other => Self::Other(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "REJECT"),
            Self::Accept => write!(f, "ACCEPT"),
            Self::Other(code) => write!(f, "CMD({code:#04X})"),
        }
    }
}
