//! Window numbers, request modes and device addressing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ControlByte, FrameError, ADDRESS_BASE, MAX_DEVNO};

/// A window (register) number in `0..=999`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Window(u16);

impl Window {
    /// Highest window number
    pub const MAX: u16 = 999;

    /// Create a window, checking the range
    pub fn new(number: u16) -> Result<Self, FrameError> {
        if number <= Self::MAX {
            Ok(Self(number))
        } else {
            Err(FrameError::InvalidWindow(number))
        }
    }

    /// Window number
    pub fn number(self) -> u16 {
        self.0
    }

    /// The three ASCII digits sent on the wire
    pub fn to_ascii(self) -> [u8; 3] {
        let n = self.0;
        [
            b'0' + (n / 100) as u8,
            b'0' + (n / 10 % 10) as u8,
            b'0' + (n % 10) as u8,
        ]
    }

    /// Parse the three-digit wire form. Leading zeros are decimal, never octal.
    pub fn from_ascii(digits: &[u8]) -> Option<Self> {
        if digits.len() != 3 || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let n = digits
            .iter()
            .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
        Some(Self(n))
    }
}

impl TryFrom<u16> for Window {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Window> for u16 {
    fn from(window: Window) -> Self {
        window.0
    }
}

impl FromStr for Window {
    type Err = FrameError;

    /// Accepts the wire form ("007") as well as plain numbers ("7")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u16 = s
            .parse()
            .map_err(|_| FrameError::InvalidWindowText(s.to_string()))?;
        Self::new(n)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Request direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Read the window; request carries no data
    Read,
    /// Write the request data into the window
    Write,
}

impl Mode {
    /// Mode byte on the wire
    pub fn byte(self) -> u8 {
        match self {
            Mode::Read => ControlByte::Read.byte(),
            Mode::Write => ControlByte::Write.byte(),
        }
    }

    /// Recognise a mode byte echoed in a reply
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Mode::Read),
            b'1' => Some(Mode::Write),
            _ => None,
        }
    }
}

/// How the controller is wired to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// RS-232: single controller, devno is always 0
    #[default]
    PointToPoint,
    /// RS-485: up to 32 controllers on a shared line
    MultiDrop,
}

impl Addressing {
    /// Highest devno allowed in this mode
    pub fn max_devno(self) -> u8 {
        match self {
            Addressing::PointToPoint => 0,
            Addressing::MultiDrop => MAX_DEVNO,
        }
    }
}

/// A validated device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Validate `devno` against the addressing mode
    pub fn new(devno: u8, addressing: Addressing) -> Result<Self, FrameError> {
        if devno <= addressing.max_devno() {
            Ok(Self(devno))
        } else {
            Err(FrameError::InvalidAddress { devno, addressing })
        }
    }

    /// Recover the address from its wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        byte.checked_sub(ADDRESS_BASE)
            .filter(|devno| *devno <= MAX_DEVNO)
            .map(Self)
    }

    /// Bus sub-address
    pub fn devno(self) -> u8 {
        self.0
    }

    /// Address byte on the wire
    pub fn byte(self) -> u8 {
        ADDRESS_BASE + self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_range() {
        assert!(Window::new(0).is_ok());
        assert!(Window::new(999).is_ok());
        assert!(matches!(
            Window::new(1000),
            Err(FrameError::InvalidWindow(1000))
        ));
    }

    #[test]
    fn test_window_ascii() {
        assert_eq!(Window::new(0).unwrap().to_ascii(), *b"000");
        assert_eq!(Window::new(7).unwrap().to_ascii(), *b"007");
        assert_eq!(Window::new(224).unwrap().to_ascii(), *b"224");
        assert_eq!(Window::new(8).unwrap().to_string(), "008");
    }

    #[test]
    fn test_window_from_ascii_is_decimal() {
        // "010" is ten, not octal eight
        assert_eq!(Window::from_ascii(b"010").map(Window::number), Some(10));
        assert_eq!(Window::from_ascii(b"999").map(Window::number), Some(999));
        assert_eq!(Window::from_ascii(b"10"), None);
        assert_eq!(Window::from_ascii(b"0a1"), None);
        assert_eq!("010".parse::<Window>().unwrap().number(), 10);
        assert_eq!("1000".parse::<Window>(), Err(FrameError::InvalidWindow(1000)));
        assert_eq!(
            "-1".parse::<Window>(),
            Err(FrameError::InvalidWindowText("-1".into()))
        );
    }

    #[test]
    fn test_window_ascii_round_trip_all() {
        for n in 0..=Window::MAX {
            let w = Window::new(n).unwrap();
            assert_eq!(Window::from_ascii(&w.to_ascii()), Some(w));
        }
    }

    #[test]
    fn test_mode_bytes() {
        assert_eq!(Mode::Read.byte(), b'0');
        assert_eq!(Mode::Write.byte(), b'1');
        assert_eq!(Mode::from_byte(b'1'), Some(Mode::Write));
        assert_eq!(Mode::from_byte(b'2'), None);
    }

    #[test]
    fn test_point_to_point_address() {
        assert_eq!(
            DeviceAddress::new(0, Addressing::PointToPoint).unwrap().byte(),
            0x80
        );
        assert!(matches!(
            DeviceAddress::new(1, Addressing::PointToPoint),
            Err(FrameError::InvalidAddress { devno: 1, .. })
        ));
    }

    #[test]
    fn test_multidrop_address() {
        let addr = DeviceAddress::new(31, Addressing::MultiDrop).unwrap();
        assert_eq!(addr.byte(), 0x9F);
        assert!(DeviceAddress::new(32, Addressing::MultiDrop).is_err());
        assert_eq!(DeviceAddress::from_byte(0x9F), Some(addr));
        assert_eq!(DeviceAddress::from_byte(0x7F), None);
        assert_eq!(DeviceAddress::from_byte(0xA0), None);
    }
}
