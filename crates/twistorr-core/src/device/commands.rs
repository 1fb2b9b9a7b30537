//! Controller windows and value formats
//!
//! Window numbers and data encodings used by the high-level operations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::ControlByte;

/// Start/stop (logic): '1' starts the pump, '0' stops it
pub const WINDOW_START_STOP: u16 = 0;

/// Pressure unit selection (numeric, 6 digits)
pub const WINDOW_PRESSURE_UNIT: u16 = 163;

/// Gauge pressure reading (alphanumeric)
pub const WINDOW_PRESSURE: u16 = 224;

/// Width of numeric window values on the wire
pub const NUMERIC_WIDTH: usize = 6;

/// Outcome of a write, from the single status byte of the acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteStatus {
    /// Accepted
    Ack,
    /// Refused without a specific reason
    Nack,
    /// Window number unknown
    UnknownWindow,
    /// Data type does not fit the window
    DataTypeError,
    /// Value out of range
    OutOfRange,
    /// Window disabled
    WindowDisabled,
}

impl WriteStatus {
    /// Decode a status byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        ControlByte::status(byte).and_then(|control| match control {
            ControlByte::Ack => Some(WriteStatus::Ack),
            ControlByte::Nack => Some(WriteStatus::Nack),
            ControlByte::UnknownWindow => Some(WriteStatus::UnknownWindow),
            ControlByte::DataTypeError => Some(WriteStatus::DataTypeError),
            ControlByte::OutOfRange => Some(WriteStatus::OutOfRange),
            ControlByte::WindowDisabled => Some(WriteStatus::WindowDisabled),
            _ => None,
        })
    }

    /// Whether the write was applied
    pub fn is_ack(self) -> bool {
        self == WriteStatus::Ack
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            WriteStatus::Ack => "ACK",
            WriteStatus::Nack => "NACK",
            WriteStatus::UnknownWindow => "unknown window",
            WriteStatus::DataTypeError => "data type error",
            WriteStatus::OutOfRange => "out of range",
            WriteStatus::WindowDisabled => "window disabled",
        };
        f.write_str(text)
    }
}

/// Pressure unit selectable through window 163
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureUnit {
    /// Millibar
    Mbar,
    /// Pascal
    Pa,
    /// Torr
    Torr,
}

impl PressureUnit {
    /// Numeric code stored in the window
    pub fn code(self) -> u32 {
        match self {
            PressureUnit::Mbar => 0,
            PressureUnit::Pa => 1,
            PressureUnit::Torr => 2,
        }
    }

    /// Look up a unit by code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PressureUnit::Mbar),
            1 => Some(PressureUnit::Pa),
            2 => Some(PressureUnit::Torr),
            _ => None,
        }
    }

    /// Six-digit data written to the window
    pub fn to_data(self) -> String {
        format_numeric(self.code())
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PressureUnit::Mbar => "mbar",
            PressureUnit::Pa => "Pa",
            PressureUnit::Torr => "Torr",
        })
    }
}

/// Zero-padded numeric window data
pub fn format_numeric(value: u32) -> String {
    format!("{:0width$}", value, width = NUMERIC_WIDTH)
}

/// A pressure reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pressure {
    /// Numeric value in the controller's current unit
    pub value: f64,
    /// Text in front of the number, if the controller sent any
    pub prefix: String,
    /// The reading exactly as received
    pub raw: String,
}

/// Parse pressure window data such as `"1.2E-03"` or `"mbar 1.2E-03"`.
///
/// Anything before the first character that can start a number is kept as
/// the prefix; the rest must parse as a float.
pub fn parse_pressure(data: &[u8]) -> Result<Pressure, String> {
    let raw = std::str::from_utf8(data).map_err(|e| e.to_string())?;
    let trimmed = raw.trim();
    let start = trimmed
        .find(|c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
        .ok_or_else(|| "no numeric value".to_string())?;

    let value = trimmed[start..]
        .trim()
        .parse::<f64>()
        .map_err(|e| e.to_string())?;

    Ok(Pressure {
        value,
        prefix: trimmed[..start].trim().to_string(),
        raw: raw.to_string(),
    })
}
