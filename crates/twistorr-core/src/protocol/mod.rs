//! Serial Protocol Communication
//!
//! Implements the TwisTorr window protocol: framed, XOR-checksummed
//! read/write requests addressed to numbered windows on the controller.
//!
//! Layers, bottom-up:
//! - [`frame`]: stateless encode/decode of single frames
//! - [`scanner`]: reply extraction from a fragmented byte stream
//! - [`engine`] / [`async_engine`]: request/response exchange with bounded retries

pub mod async_engine;
pub mod codec;
pub mod control;
pub mod engine;
mod error;
pub mod frame;
pub mod scanner;
pub mod serial;
pub mod transport;
pub mod window;

pub use async_engine::{open_async_port, AsyncQueryEngine};
pub use codec::TwisTorrCodec;
pub use control::ControlByte;
pub use engine::{QueryConfig, QueryEngine};
pub use error::{AttemptFailure, FrameError, QueryError, TransportError};
pub use frame::{checksum, decode, encode, Reply, Request};
pub use scanner::StreamScanner;
pub use serial::{configure_port, list_ports, open_port, PortInfo};
pub use transport::{SerialTransport, TcpTransport, Transport};
pub use window::{Addressing, DeviceAddress, Mode, Window};

/// Default baud rate of the controller's RS-232/RS-485 port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-attempt reply timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default wait between sending a request and reading the reply
pub const DEFAULT_INTER_FRAME_DELAY_MS: u64 = 50;

/// Default number of attempts per query
pub const DEFAULT_RETRIES: u32 = 3;

/// Address byte offset: the wire address is `ADDRESS_BASE + devno`
pub const ADDRESS_BASE: u8 = 0x80;

/// Highest devno accepted on a multi-drop (RS-485) bus
pub const MAX_DEVNO: u8 = 31;

/// Largest frame the scanner will hold while waiting for ETX before resyncing
pub const MAX_FRAME_SIZE: usize = 256;

/// Smallest well-formed frame: STX, ADDR, ETX, C1, C0
pub const MIN_FRAME_SIZE: usize = 5;
