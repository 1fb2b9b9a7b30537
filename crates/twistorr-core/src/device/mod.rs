//! TwisTorr controller operations
//!
//! Thin layer over [`QueryEngine`]: each operation builds one request,
//! runs one query and interprets the reply. Replies with a bad checksum
//! are refused here rather than retried, since the write they answer may
//! already have taken effect.

pub mod commands;

use thiserror::Error;

use crate::config::ControllerConfig;
use crate::protocol::{
    Addressing, DeviceAddress, FrameError, Mode, QueryEngine, QueryError, Reply, Request,
    SerialTransport, Transport, TransportError, Window,
};
use commands::{
    format_numeric, parse_pressure, Pressure, PressureUnit, WriteStatus, WINDOW_PRESSURE,
    WINDOW_PRESSURE_UNIT, WINDOW_START_STOP,
};

/// Errors from high-level controller operations
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("window {window}: controller replied {status}")]
    Rejected { window: Window, status: WriteStatus },

    #[error("window {window}: reply checksum mismatch")]
    Integrity { window: Window },

    #[error("window {window}: unexpected reply {payload:?}")]
    UnexpectedReply { window: Window, payload: String },

    #[error("window {window}: invalid value {value:?}: {reason}")]
    InvalidValue {
        window: Window,
        value: String,
        reason: String,
    },
}

impl From<FrameError> for DeviceError {
    fn from(err: FrameError) -> Self {
        DeviceError::Query(QueryError::Encode(err))
    }
}

/// A TwisTorr pump controller
pub struct TwisTorr<T: Transport> {
    engine: QueryEngine<T>,
    devno: u8,
}

impl TwisTorr<SerialTransport> {
    /// Open the serial port named in `config` and set up the engine
    pub fn open(config: &ControllerConfig) -> Result<Self, DeviceError> {
        let transport = SerialTransport::open(&config.port_name, config.baud_rate)?;
        let engine = QueryEngine::with_config(transport, config.addressing, config.query.clone());
        Self::new(engine, config.devno)
    }
}

impl<T: Transport> TwisTorr<T> {
    /// Wrap an engine; `devno` must suit the engine's addressing mode
    pub fn new(engine: QueryEngine<T>, devno: u8) -> Result<Self, DeviceError> {
        DeviceAddress::new(devno, engine.addressing())?;
        Ok(Self { engine, devno })
    }

    /// Bus address of this controller
    pub fn devno(&self) -> u8 {
        self.devno
    }

    /// Borrow the query engine
    pub fn engine(&self) -> &QueryEngine<T> {
        &self.engine
    }

    /// Mutably borrow the query engine
    pub fn engine_mut(&mut self) -> &mut QueryEngine<T> {
        &mut self.engine
    }

    /// Start the pump
    pub fn start(&mut self) -> Result<(), DeviceError> {
        tracing::info!(devno = self.devno, "starting pump");
        self.write_logic(WINDOW_START_STOP, true)
    }

    /// Stop the pump
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        tracing::info!(devno = self.devno, "stopping pump");
        self.write_logic(WINDOW_START_STOP, false)
    }

    /// Whether the start/stop window reads "started"
    pub fn is_started(&mut self) -> Result<bool, DeviceError> {
        self.read_logic(WINDOW_START_STOP)
    }

    /// Read the gauge pressure in the currently selected unit
    pub fn read_pressure(&mut self) -> Result<Pressure, DeviceError> {
        let (window, data) = self.read_data(WINDOW_PRESSURE)?;
        parse_pressure(&data).map_err(|reason| DeviceError::InvalidValue {
            window,
            value: String::from_utf8_lossy(&data).into_owned(),
            reason,
        })
    }

    /// Select the unit used for pressure readings
    pub fn set_pressure_unit(&mut self, unit: PressureUnit) -> Result<(), DeviceError> {
        self.write_window(WINDOW_PRESSURE_UNIT, unit.to_data().as_bytes())
    }

    /// Read the selected pressure unit
    pub fn read_pressure_unit(&mut self) -> Result<PressureUnit, DeviceError> {
        let (window, data) = self.read_data(WINDOW_PRESSURE_UNIT)?;
        let code = parse_numeric(window, &data)?;
        PressureUnit::from_code(code).ok_or_else(|| DeviceError::InvalidValue {
            window,
            value: code.to_string(),
            reason: "unknown unit code".to_string(),
        })
    }

    /// Read a window and return its data, without the window/mode echo
    pub fn read_window(&mut self, number: u16) -> Result<Vec<u8>, DeviceError> {
        Ok(self.read_data(number)?.1)
    }

    /// Write `data` into a window and require an ACK
    pub fn write_window(&mut self, number: u16, data: &[u8]) -> Result<(), DeviceError> {
        let request = Request::write(number, data)?.with_device(self.devno);
        let reply = self.checked_reply(&request)?;

        match reply.payload() {
            [byte] => match WriteStatus::from_byte(*byte) {
                Some(WriteStatus::Ack) => Ok(()),
                Some(status) => Err(DeviceError::Rejected {
                    window: request.window(),
                    status,
                }),
                None => Err(unexpected(request.window(), &reply)),
            },
            _ => Err(unexpected(request.window(), &reply)),
        }
    }

    /// Read a logic (on/off) window
    pub fn read_logic(&mut self, number: u16) -> Result<bool, DeviceError> {
        let (window, data) = self.read_data(number)?;
        match data.as_slice() {
            [b'1'] => Ok(true),
            [b'0'] => Ok(false),
            _ => Err(DeviceError::InvalidValue {
                window,
                value: String::from_utf8_lossy(&data).into_owned(),
                reason: "expected '0' or '1'".to_string(),
            }),
        }
    }

    /// Write a logic (on/off) window
    pub fn write_logic(&mut self, number: u16, on: bool) -> Result<(), DeviceError> {
        self.write_window(number, if on { b"1" } else { b"0" })
    }

    /// Read a six-digit numeric window
    pub fn read_numeric(&mut self, number: u16) -> Result<u32, DeviceError> {
        let (window, data) = self.read_data(number)?;
        parse_numeric(window, &data)
    }

    /// Write a six-digit numeric window
    pub fn write_numeric(&mut self, number: u16, value: u32) -> Result<(), DeviceError> {
        self.write_window(number, format_numeric(value).as_bytes())
    }

    fn read_data(&mut self, number: u16) -> Result<(Window, Vec<u8>), DeviceError> {
        let request = Request::read(number)?.with_device(self.devno);
        let window = request.window();
        let reply = self.checked_reply(&request)?;

        // Errors such as an unknown window come back as a lone status byte
        match reply.status().and_then(|c| WriteStatus::from_byte(c.byte())) {
            Some(WriteStatus::Ack) => return Err(unexpected(window, &reply)),
            Some(status) => return Err(DeviceError::Rejected { window, status }),
            None => {}
        }

        match reply.window_echo() {
            Some((echoed, Mode::Read, data)) if echoed == window => Ok((window, data.to_vec())),
            _ => Err(unexpected(window, &reply)),
        }
    }

    fn checked_reply(&mut self, request: &Request) -> Result<Reply, DeviceError> {
        let reply = self.engine.send(request)?;
        if !reply.is_checksum_valid() {
            tracing::warn!(window = %request.window(), "reply checksum mismatch");
            return Err(DeviceError::Integrity {
                window: request.window(),
            });
        }
        // Another controller on a shared bus must not answer for this one
        if self.engine.addressing() == Addressing::MultiDrop && reply.devno() != self.devno {
            tracing::warn!(
                window = %request.window(),
                expected = self.devno,
                got = reply.devno(),
                "reply from another device"
            );
            return Err(unexpected(request.window(), &reply));
        }
        Ok(reply)
    }
}

fn parse_numeric(window: Window, data: &[u8]) -> Result<u32, DeviceError> {
    let text = String::from_utf8_lossy(data);
    text.trim()
        .parse::<u32>()
        .map_err(|e| DeviceError::InvalidValue {
            window,
            value: text.to_string(),
            reason: e.to_string(),
        })
}

fn unexpected(window: Window, reply: &Reply) -> DeviceError {
    DeviceError::UnexpectedReply {
        window,
        payload: String::from_utf8_lossy(reply.payload()).into_owned(),
    }
}
