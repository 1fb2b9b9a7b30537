//! Frame encoding/decoding
//!
//! Frame format:
//! - 1 byte: STX (0x02)
//! - 1 byte: address, `0x80 + devno`
//! - requests: 3 ASCII window digits, 1 mode byte ('0' read, '1' write), data
//! - replies: payload
//! - 1 byte: ETX (0x03)
//! - 2 bytes: XOR of address..ETX inclusive, as uppercase ASCII hex
//!
//! A reply's payload is everything between the address byte and ETX. For a
//! read reply that is the window echo, the mode echo and the data; for a
//! write acknowledgement it is a single status byte.

use super::{
    Addressing, ControlByte, DeviceAddress, FrameError, Mode, Window, MIN_FRAME_SIZE,
};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Checksum of the covered bytes (address through ETX) as two ASCII hex characters
pub fn checksum(bytes: &[u8]) -> [u8; 2] {
    let xor = bytes.iter().fold(0u8, |acc, b| acc ^ b);
    [
        HEX_DIGITS[(xor >> 4) as usize],
        HEX_DIGITS[(xor & 0x0F) as usize],
    ]
}

/// Encode a request frame.
///
/// Validation happens before any byte is produced: the window must be in
/// range, a read must not carry data, and `devno` must be allowed by the
/// addressing mode.
pub fn encode(
    window: u16,
    mode: Mode,
    devno: u8,
    payload: &[u8],
    addressing: Addressing,
) -> Result<Vec<u8>, FrameError> {
    let window = Window::new(window)?;
    let address = DeviceAddress::new(devno, addressing)?;
    validate_payload(mode, payload)?;
    Ok(encode_frame(address, window, mode, payload))
}

fn validate_payload(mode: Mode, payload: &[u8]) -> Result<(), FrameError> {
    if mode == Mode::Read && !payload.is_empty() {
        return Err(FrameError::UnexpectedPayload);
    }
    if let Some(&byte) = payload
        .iter()
        .find(|b| !b.is_ascii() || **b == ControlByte::Stx.byte() || **b == ControlByte::Etx.byte())
    {
        return Err(FrameError::InvalidPayloadByte(byte));
    }
    Ok(())
}

fn encode_frame(address: DeviceAddress, window: Window, mode: Mode, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MIN_FRAME_SIZE + 4 + payload.len());
    bytes.push(ControlByte::Stx.byte());
    bytes.push(address.byte());
    bytes.extend_from_slice(&window.to_ascii());
    bytes.push(mode.byte());
    bytes.extend_from_slice(payload);
    bytes.push(ControlByte::Etx.byte());

    let crc = checksum(&bytes[1..]);
    bytes.extend_from_slice(&crc);
    bytes
}

/// Decode exactly one complete frame.
///
/// A checksum mismatch does not fail the decode; it is reported through
/// [`Reply::is_checksum_valid`].
pub fn decode(raw: &[u8]) -> Result<Reply, FrameError> {
    if raw.is_empty() {
        return Err(FrameError::EmptyFrame);
    }
    if raw.len() < MIN_FRAME_SIZE {
        return Err(FrameError::MalformedFrame(format!(
            "{} bytes is shorter than the minimum frame",
            raw.len()
        )));
    }
    if raw[0] != ControlByte::Stx.byte() {
        return Err(FrameError::MalformedFrame(format!(
            "frame starts with {:#04x}, expected STX",
            raw[0]
        )));
    }

    let etx = raw.len() - 3;
    if raw[etx] != ControlByte::Etx.byte() {
        return Err(FrameError::MalformedFrame(
            "ETX not followed by exactly two checksum bytes".to_string(),
        ));
    }

    let address = DeviceAddress::from_byte(raw[1]).ok_or_else(|| {
        FrameError::MalformedFrame(format!("invalid address byte {:#04x}", raw[1]))
    })?;

    let received = [raw[etx + 1], raw[etx + 2]];
    let checksum_ok = checksum(&raw[1..=etx]) == received;

    Ok(Reply {
        address,
        payload: raw[2..etx].to_vec(),
        checksum_ok,
        received_checksum: received,
    })
}

/// A validated outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    window: Window,
    mode: Mode,
    devno: u8,
    data: Vec<u8>,
}

impl Request {
    /// Read request for `window`
    pub fn read(window: u16) -> Result<Self, FrameError> {
        Self::new(window, Mode::Read, Vec::new())
    }

    /// Write request putting `data` into `window`
    pub fn write(window: u16, data: impl Into<Vec<u8>>) -> Result<Self, FrameError> {
        Self::new(window, Mode::Write, data.into())
    }

    /// Request with explicit mode
    pub fn new(window: u16, mode: Mode, data: Vec<u8>) -> Result<Self, FrameError> {
        let window = Window::new(window)?;
        validate_payload(mode, &data)?;
        Ok(Self {
            window,
            mode,
            devno: 0,
            data,
        })
    }

    /// Address a specific controller on a multi-drop bus.
    ///
    /// The devno is checked against the addressing mode at encode time.
    pub fn with_device(mut self, devno: u8) -> Self {
        self.devno = devno;
        self
    }

    /// Target window
    pub fn window(&self) -> Window {
        self.window
    }

    /// Read or write
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Target devno
    pub fn devno(&self) -> u8 {
        self.devno
    }

    /// Data sent with a write
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode to wire bytes
    pub fn encode(&self, addressing: Addressing) -> Result<Vec<u8>, FrameError> {
        let address = DeviceAddress::new(self.devno, addressing)?;
        Ok(encode_frame(address, self.window, self.mode, &self.data))
    }
}

/// A decoded reply frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    address: DeviceAddress,
    payload: Vec<u8>,
    checksum_ok: bool,
    received_checksum: [u8; 2],
}

impl Reply {
    /// Devno of the replying controller
    pub fn devno(&self) -> u8 {
        self.address.devno()
    }

    /// Bytes between the address byte and ETX
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the reply, keeping only the payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Whether the received checksum matched the recomputed one
    pub fn is_checksum_valid(&self) -> bool {
        self.checksum_ok
    }

    /// The two checksum characters as received
    pub fn received_checksum(&self) -> [u8; 2] {
        self.received_checksum
    }

    /// Write acknowledgement status, when the payload is a single status byte
    pub fn status(&self) -> Option<ControlByte> {
        match self.payload.as_slice() {
            [byte] => ControlByte::status(*byte),
            _ => None,
        }
    }

    /// Split a read reply into the echoed window, echoed mode and data
    pub fn window_echo(&self) -> Option<(Window, Mode, &[u8])> {
        if self.payload.len() < 4 {
            return None;
        }
        let window = Window::from_ascii(&self.payload[..3])?;
        let mode = Mode::from_byte(self.payload[3])?;
        Some((window, mode, &self.payload[4..]))
    }
}
