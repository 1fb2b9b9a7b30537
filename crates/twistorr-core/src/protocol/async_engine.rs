//! Async query engine
//!
//! Same exchange policy as [`QueryEngine`](super::QueryEngine), over any
//! `AsyncRead + AsyncWrite` stream framed with [`TwisTorrCodec`]. Both the
//! inter-frame delay and the reply wait race against a
//! [`CancellationToken`].

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use super::{
    Addressing, AttemptFailure, Mode, QueryConfig, QueryError, Reply, Request, TransportError,
    TwisTorrCodec,
};

/// Open a serial port as an async stream (8N1, no flow control)
pub fn open_async_port(name: &str, baud_rate: u32) -> Result<SerialStream, TransportError> {
    tracing::debug!(port = name, baud = baud_rate, "opening async serial port");
    // Builder defaults are already 8 data bits, no parity, one stop bit
    tokio_serial::new(name, baud_rate)
        .open_native_async()
        .map_err(|e| TransportError::SerialError(e.to_string()))
}

/// Async request/response engine with bounded retries
pub struct AsyncQueryEngine<S> {
    framed: Framed<S, TwisTorrCodec>,
    addressing: Addressing,
    config: QueryConfig,
}

impl<S> AsyncQueryEngine<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create an engine with default timing
    pub fn new(stream: S, addressing: Addressing) -> Self {
        Self::with_config(stream, addressing, QueryConfig::default())
    }

    /// Create an engine with explicit timing
    pub fn with_config(stream: S, addressing: Addressing, config: QueryConfig) -> Self {
        Self {
            framed: Framed::new(stream, TwisTorrCodec::new()),
            addressing,
            config,
        }
    }

    /// Current timing settings
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Give the stream back
    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }

    /// Build, send and await one request (not cancellable)
    pub async fn query(
        &mut self,
        window: u16,
        mode: Mode,
        devno: u8,
        payload: &[u8],
    ) -> Result<Reply, QueryError> {
        let request = Request::new(window, mode, payload.to_vec())?.with_device(devno);
        self.send(&request, &CancellationToken::new()).await
    }

    /// Send a prepared request; `cancel` aborts the current attempt and
    /// prevents further ones
    pub async fn send(
        &mut self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Reply, QueryError> {
        let frame = Bytes::from(request.encode(self.addressing)?);
        let attempts = self.config.attempts();

        // Leftovers from an earlier exchange must not answer this request
        self.framed.read_buffer_mut().clear();

        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(QueryError::Cancelled { attempt });
            }
            tracing::debug!(window = %request.window(), attempt, attempts, "sending request");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(QueryError::Cancelled { attempt }),
                outcome = self.attempt(frame.clone()) => outcome,
            };

            match outcome {
                Ok(reply) => return Ok(reply),
                Err(failure) => {
                    tracing::debug!(attempt, stage = failure.stage(), "attempt failed: {failure}");
                    if attempt >= attempts {
                        return Err(QueryError::Exhausted {
                            attempts,
                            last: failure,
                        });
                    }
                }
            }
            attempt += 1;
        }
    }

    async fn attempt(&mut self, frame: Bytes) -> Result<Reply, AttemptFailure> {
        // `send` flushes, so the whole frame is on the wire before timing starts
        self.framed
            .send(frame)
            .await
            .map_err(AttemptFailure::SendFailure)?;

        time::sleep(self.config.inter_frame_delay()).await;

        let deadline = Instant::now() + self.config.read_timeout();
        let mut malformed = None;
        loop {
            match time::timeout_at(deadline, self.framed.next()).await {
                Err(_) => break,
                Ok(None) => {
                    return Err(AttemptFailure::ReceiveFailure(
                        io::Error::from(io::ErrorKind::UnexpectedEof).into(),
                    ))
                }
                Ok(Some(Err(e))) => return Err(AttemptFailure::ReceiveFailure(e)),
                Ok(Some(Ok(Ok(reply)))) => return Ok(reply),
                Ok(Some(Ok(Err(e)))) => {
                    tracing::trace!("discarding malformed frame: {e}");
                    malformed = Some(e);
                }
            }
        }

        let pending = self.framed.read_buffer().len();
        Err(match malformed {
            Some(e) => AttemptFailure::Malformed(e),
            None if pending == 0 => AttemptFailure::ReceiveEmpty,
            None => AttemptFailure::ReceiveTimeout { received: pending },
        })
    }
}
