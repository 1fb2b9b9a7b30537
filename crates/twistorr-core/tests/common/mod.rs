//! Scripted in-memory transport shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

use twistorr_core::protocol::{checksum, QueryConfig, Transport, TransportError};

/// What the fake controller does with the next request it receives
#[derive(Debug, Clone)]
pub enum Response {
    /// Never answers
    Silent,
    /// Accepts only part of the frame and never answers
    ShortWrite,
    /// Write fails at the channel level
    WriteError,
    /// Answers with these chunks, one per read
    Chunks(Vec<Vec<u8>>),
}

impl Response {
    /// Answer with one complete chunk
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Response::Chunks(vec![bytes])
    }

    /// Answer one byte per read
    pub fn trickle(bytes: Vec<u8>) -> Self {
        Response::Chunks(bytes.into_iter().map(|b| vec![b]).collect())
    }
}

/// Transport that answers each write from a script
pub struct ScriptedTransport {
    script: VecDeque<Response>,
    pending: VecDeque<Vec<u8>>,
    /// Every frame handed to `write`, in order
    pub writes: Vec<Vec<u8>>,
    pub flushes: usize,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Response>) -> Self {
        Self {
            script: script.into(),
            pending: VecDeque::new(),
            writes: Vec::new(),
            flushes: 0,
        }
    }
}

impl Transport for ScriptedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.writes.push(bytes.to_vec());
        match self.script.pop_front().unwrap_or(Response::Silent) {
            Response::Silent => Ok(bytes.len()),
            Response::ShortWrite => Ok(bytes.len() - 1),
            Response::WriteError => Err(TransportError::SerialError("line fault".into())),
            Response::Chunks(chunks) => {
                self.pending.extend(chunks);
                Ok(bytes.len())
            }
        }
    }

    fn read_available(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        match self.pending.pop_front() {
            Some(mut chunk) => {
                if chunk.len() > max_bytes {
                    let rest = chunk.split_off(max_bytes);
                    self.pending.push_front(rest);
                }
                Ok(chunk)
            }
            None => {
                std::thread::sleep(timeout);
                Ok(Vec::new())
            }
        }
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes += 1;
        Ok(())
    }
}

/// Reply frame from devno 0 carrying `payload`
pub fn reply_frame(payload: &[u8]) -> Vec<u8> {
    reply_frame_from(0, payload)
}

/// Reply frame from `devno` carrying `payload`
pub fn reply_frame_from(devno: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x02, 0x80 + devno];
    bytes.extend_from_slice(payload);
    bytes.push(0x03);
    let crc = checksum(&bytes[1..]);
    bytes.extend_from_slice(&crc);
    bytes
}

/// Read reply echoing `window` followed by `data`
pub fn read_reply(window: u16, data: &[u8]) -> Vec<u8> {
    let mut payload = format!("{:03}0", window).into_bytes();
    payload.extend_from_slice(data);
    reply_frame(&payload)
}

/// Fast timing so failing attempts finish quickly
pub fn fast_config(retries: u32) -> QueryConfig {
    QueryConfig {
        retries,
        inter_frame_delay_ms: 1,
        read_timeout_ms: 30,
        poll_interval_ms: 5,
        max_read: 64,
    }
}
