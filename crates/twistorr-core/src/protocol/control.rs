//! Protocol control bytes
//!
//! Framing delimiters, mode bytes and the single-byte status codes a
//! controller returns when acknowledging a write.

use serde::{Deserialize, Serialize};

/// Every byte value with a fixed meaning on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlByte {
    /// Start of text, opens every frame
    Stx = 0x02,
    /// End of text, followed by two checksum characters
    Etx = 0x03,
    /// Write accepted
    Ack = 0x06,
    /// Write refused
    Nack = 0x15,
    /// Mode byte of a read request (ASCII '0'); also the logic "off" value
    Read = 0x30,
    /// Mode byte of a write request (ASCII '1'); also the logic "on" value
    Write = 0x31,
    /// Window number not known to the controller
    UnknownWindow = 0x32,
    /// Data does not match the window's type
    DataTypeError = 0x33,
    /// Value outside the window's range
    OutOfRange = 0x34,
    /// Window exists but is currently disabled
    WindowDisabled = 0x35,
}

impl ControlByte {
    /// Raw byte value
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Interpret the first payload byte of a write acknowledgement.
    ///
    /// Only the status codes are recognised here; delimiters and mode bytes
    /// never appear in that position.
    pub fn status(byte: u8) -> Option<Self> {
        match byte {
            0x06 => Some(ControlByte::Ack),
            0x15 => Some(ControlByte::Nack),
            0x32 => Some(ControlByte::UnknownWindow),
            0x33 => Some(ControlByte::DataTypeError),
            0x34 => Some(ControlByte::OutOfRange),
            0x35 => Some(ControlByte::WindowDisabled),
            _ => None,
        }
    }

    /// Whether this is one of the write acknowledgement codes
    pub fn is_status(self) -> bool {
        Self::status(self.byte()).is_some()
    }
}

impl From<ControlByte> for u8 {
    fn from(value: ControlByte) -> Self {
        value.byte()
    }
}
