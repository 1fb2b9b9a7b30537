//! # TwisTorr Core Library
//!
//! Serial protocol driver for TwisTorr turbomolecular pump controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame encoding/decoding with the controller's XOR checksum
//! - Reply extraction from fragmented serial streams
//! - Blocking and async query engines with bounded retries
//! - Serial and TCP transports
//! - High-level pump operations (start, stop, pressure readout)
//!
//! ## Example
//!
//! ```rust,ignore
//! use twistorr_core::{config::ControllerConfig, device::TwisTorr};
//!
//! let config = ControllerConfig {
//!     port_name: "/dev/ttyUSB0".into(),
//!     ..Default::default()
//! };
//! let mut pump = TwisTorr::open(&config)?;
//! pump.start()?;
//! println!("pressure: {}", pump.read_pressure()?.value);
//! ```

pub mod config;
pub mod device;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, ControllerConfig};
    pub use crate::device::commands::{Pressure, PressureUnit, WriteStatus};
    pub use crate::device::{DeviceError, TwisTorr};
    pub use crate::protocol::{
        Addressing, AsyncQueryEngine, Mode, QueryConfig, QueryEngine, QueryError, Reply, Request,
        StreamScanner, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
