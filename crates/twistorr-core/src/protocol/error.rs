//! Protocol errors
//!
//! Construction and parse failures ([`FrameError`]) are kept apart from
//! link failures ([`AttemptFailure`]): only the latter are ever retried.

use thiserror::Error;

use super::Addressing;

/// Errors from building or parsing a single frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("window {0} outside 0..=999")]
    InvalidWindow(u16),

    #[error("invalid window number '{0}'")]
    InvalidWindowText(String),

    #[error("read request cannot carry data")]
    UnexpectedPayload,

    #[error("payload byte {0:#04x} is not printable frame data")]
    InvalidPayloadByte(u8),

    #[error("devno {devno} not allowed for {addressing:?} addressing")]
    InvalidAddress { devno: u8, addressing: Addressing },

    #[error("empty frame")]
    EmptyFrame,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

impl FrameError {
    /// Caller misuse detected before anything was sent
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidWindow(_)
                | FrameError::InvalidWindowText(_)
                | FrameError::UnexpectedPayload
                | FrameError::InvalidPayloadByte(_)
                | FrameError::InvalidAddress { .. }
        )
    }
}

/// Channel-level faults reported by a transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => TransportError::PortNotFound(err.description),
            _ => TransportError::SerialError(err.description),
        }
    }
}

/// Why a single attempt of a query produced no reply
#[derive(Error, Debug)]
pub enum AttemptFailure {
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("send failed: {0}")]
    SendFailure(#[source] TransportError),

    #[error("receive failed: {0}")]
    ReceiveFailure(#[source] TransportError),

    #[error("timed out with {received} bytes but no complete frame")]
    ReceiveTimeout { received: usize },

    #[error("no reply bytes received")]
    ReceiveEmpty,

    #[error("unparseable reply frame: {0}")]
    Malformed(#[source] FrameError),
}

impl AttemptFailure {
    /// Stage of the exchange that failed
    pub fn stage(&self) -> &'static str {
        match self {
            AttemptFailure::ShortWrite { .. } | AttemptFailure::SendFailure(_) => "send",
            _ => "receive",
        }
    }
}

/// Final outcome of a failed query
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request could not be encoded; nothing was sent
    #[error("invalid request: {0}")]
    Encode(#[from] FrameError),

    /// Every attempt failed
    #[error("no reply after {attempts} attempt(s); last {} failure: {last}", .last.stage())]
    Exhausted {
        attempts: u32,
        #[source]
        last: AttemptFailure,
    },

    /// Cancelled during the given attempt
    #[error("query cancelled during attempt {attempt}")]
    Cancelled { attempt: u32 },
}
