//! Byte transports consumed by the query engine
//!
//! A transport moves raw bytes and knows nothing about frames. Reads are
//! bounded: `read_available` returns whatever arrived within the timeout,
//! possibly nothing.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use super::{configure_port, open_port, TransportError};

/// Abstraction for communication channels (serial or TCP)
pub trait Transport: Send {
    /// Write bytes, returning how many the channel accepted
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max_bytes`, waiting no longer than `timeout`.
    ///
    /// Returns an empty vector when nothing arrived in time.
    fn read_available(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Make sure queued writes have been handed to the channel
    fn flush(&mut self) -> Result<(), TransportError>;

    /// Drop stale input left over from earlier exchanges
    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        (**self).write(bytes)
    }

    fn read_available(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_available(max_bytes, timeout)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_input()
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Serial port transport.
///
/// Reads poll `bytes_to_read()` instead of blocking in `read()`, which keeps
/// the timeout exact regardless of the port's own timeout setting.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    poll_interval: Duration,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            poll_interval: Duration::from_millis(2),
        }
    }

    /// Open and configure `name` for the controller (8N1, no flow control)
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let mut port = open_port(name, Some(baud_rate))?;
        configure_port(port.as_mut())?;
        Ok(Self::new(port))
    }

    /// Set how often `bytes_to_read()` is polled while waiting for data
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Name of the underlying port, if known
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        Ok(self.port.write(bytes)?)
    }

    fn read_available(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let start = Instant::now();
        let mut buffer = vec![0u8; max_bytes];

        loop {
            let available = self.port.bytes_to_read()? as usize;
            if available > 0 {
                let to_read = available.min(max_bytes);
                match self.port.read(&mut buffer[..to_read]) {
                    Ok(n) => {
                        buffer.truncate(n);
                        tracing::trace!(bytes = n, data = ?&buffer[..], "serial read");
                        return Ok(buffer);
                    }
                    Err(ref e) if is_timeout(e) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(Vec::new());
            }
            std::thread::sleep(self.poll_interval.min(timeout - elapsed));
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(self.port.flush()?)
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        Ok(self.port.clear(serialport::ClearBuffer::Input)?)
    }
}

/// TCP transport for serial-to-ethernet gateways
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Connect to a gateway
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

impl Transport for TcpTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        Ok(self.stream.write(bytes)?)
    }

    fn read_available(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        // A zero read timeout means "block forever" to the OS
        let timeout = timeout.max(Duration::from_millis(1));
        self.stream.set_read_timeout(Some(timeout))?;

        let mut buffer = vec![0u8; max_bytes];
        match self.stream.read(&mut buffer) {
            Ok(0) => Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(ref e) if is_timeout(e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(self.stream.flush()?)
    }

    fn discard_input(&mut self) -> Result<(), TransportError> {
        // No OS-level input flush for sockets: drain without blocking
        self.stream.set_nonblocking(true)?;
        let mut buf = [0u8; 256];
        let result = loop {
            match self.stream.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        Ok(result?)
    }
}
