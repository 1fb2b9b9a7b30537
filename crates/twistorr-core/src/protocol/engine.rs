//! Query engine
//!
//! Runs one request/response exchange at a time over a [`Transport`]:
//! send the frame, give the controller time to process it, then read until
//! a reply frame appears or the attempt's deadline passes. Link failures
//! are retried up to the configured number of attempts. A reply with a bad
//! checksum is returned as-is: resending a write could apply it twice.
//!
//! The engine owns its transport and takes `&mut self`; callers sharing a
//! controller between threads wrap the engine in a `Mutex`.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::{
    Addressing, AttemptFailure, Mode, QueryError, Reply, Request, StreamScanner, Transport,
    DEFAULT_INTER_FRAME_DELAY_MS, DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS,
};

/// Timing and retry settings for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Attempts per query; values below 1 are treated as 1
    pub retries: u32,
    /// Wait between sending a request and reading the reply
    pub inter_frame_delay_ms: u64,
    /// How long one attempt waits for a complete reply
    pub read_timeout_ms: u64,
    /// Granularity of read waits; also bounds cancellation latency
    pub poll_interval_ms: u64,
    /// Largest single read from the transport
    pub max_read: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            inter_frame_delay_ms: DEFAULT_INTER_FRAME_DELAY_MS,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: 10,
            max_read: 128,
        }
    }
}

impl QueryConfig {
    /// Number of attempts a query will make
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }

    /// Delay between send and receive
    pub fn inter_frame_delay(&self) -> Duration {
        Duration::from_millis(self.inter_frame_delay_ms)
    }

    /// Per-attempt read deadline
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Poll slice, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// How a single attempt ended without a reply
enum AttemptError {
    Failed(AttemptFailure),
    Cancelled,
}

impl From<AttemptFailure> for AttemptError {
    fn from(failure: AttemptFailure) -> Self {
        AttemptError::Failed(failure)
    }
}

/// Blocking request/response engine with bounded retries
pub struct QueryEngine<T: Transport> {
    transport: T,
    addressing: Addressing,
    config: QueryConfig,
    cancel: CancellationToken,
}

impl<T: Transport> QueryEngine<T> {
    /// Create an engine with default timing
    pub fn new(transport: T, addressing: Addressing) -> Self {
        Self::with_config(transport, addressing, QueryConfig::default())
    }

    /// Create an engine with explicit timing
    pub fn with_config(transport: T, addressing: Addressing, config: QueryConfig) -> Self {
        Self {
            transport,
            addressing,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Current timing settings
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Replace the timing settings
    pub fn set_config(&mut self, config: QueryConfig) {
        self.config = config;
    }

    /// Addressing mode requests are validated against
    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Token that aborts the running query from another thread.
    ///
    /// Once cancelled it stays cancelled: every later query fails with
    /// [`QueryError::Cancelled`] until [`QueryEngine::reset_cancellation`].
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Install a fresh, uncancelled token
    pub fn reset_cancellation(&mut self) {
        self.cancel = CancellationToken::new();
    }

    /// Build, send and await one request using the engine's settings
    pub fn query(
        &mut self,
        window: u16,
        mode: Mode,
        devno: u8,
        payload: &[u8],
    ) -> Result<Reply, QueryError> {
        let request = Request::new(window, mode, payload.to_vec())?.with_device(devno);
        self.send(&request)
    }

    /// Send a prepared request using the engine's settings
    pub fn send(&mut self, request: &Request) -> Result<Reply, QueryError> {
        let config = self.config.clone();
        self.send_with(request, &config)
    }

    /// Send a prepared request with per-call timing
    pub fn send_with(
        &mut self,
        request: &Request,
        config: &QueryConfig,
    ) -> Result<Reply, QueryError> {
        // Encoding errors are caller bugs: fail before touching the link
        let frame = request.encode(self.addressing)?;
        let attempts = config.attempts();
        let mut scanner = StreamScanner::new();

        if let Err(e) = self.transport.discard_input() {
            tracing::debug!("could not discard stale input: {e}");
        }

        let mut attempt = 1;
        loop {
            if self.cancel.is_cancelled() {
                return Err(QueryError::Cancelled { attempt });
            }

            tracing::debug!(
                window = %request.window(),
                mode = ?request.mode(),
                attempt,
                attempts,
                "sending request"
            );

            match self.attempt(&frame, &mut scanner, config) {
                Ok(reply) => {
                    if !reply.is_checksum_valid() {
                        tracing::debug!(
                            window = %request.window(),
                            attempt,
                            "reply checksum mismatch"
                        );
                    }
                    return Ok(reply);
                }
                Err(AttemptError::Cancelled) => {
                    return Err(QueryError::Cancelled { attempt });
                }
                Err(AttemptError::Failed(failure)) => {
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

    fn attempt(
        &mut self,
        frame: &[u8],
        scanner: &mut StreamScanner,
        config: &QueryConfig,
    ) -> Result<Reply, AttemptError> {
        let written = self
            .transport
            .write(frame)
            .map_err(AttemptFailure::SendFailure)?;
        if written != frame.len() {
            return Err(AttemptFailure::ShortWrite {
                written,
                expected: frame.len(),
            }
            .into());
        }
        self.transport
            .flush()
            .map_err(AttemptFailure::SendFailure)?;

        self.wait(config.inter_frame_delay(), config.poll_interval())?;
        self.receive(scanner, config)
    }

    /// Sleep in poll-sized slices so cancellation is noticed promptly
    fn wait(&self, delay: Duration, slice: Duration) -> Result<(), AttemptError> {
        let deadline = Instant::now() + delay;
        loop {
            if self.cancel.is_cancelled() {
                return Err(AttemptError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(slice));
        }
    }

    fn receive(
        &mut self,
        scanner: &mut StreamScanner,
        config: &QueryConfig,
    ) -> Result<Reply, AttemptError> {
        let deadline = Instant::now() + config.read_timeout();
        let mut received = 0usize;
        let mut malformed = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(AttemptError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let slice_end = (now + config.poll_interval()).min(deadline);
            let chunk = self
                .transport
                .read_available(config.max_read, slice_end - now)
                .map_err(AttemptFailure::ReceiveFailure)?;
            if chunk.is_empty() {
                // Transports may return early with nothing; finish the slice
                let now = Instant::now();
                if now < slice_end {
                    std::thread::sleep(slice_end - now);
                }
                continue;
            }
            received += chunk.len();

            for item in scanner.feed(&chunk) {
                match item {
                    Ok(reply) => return Ok(reply),
                    Err(e) => {
                        tracing::trace!("discarding malformed frame: {e}");
                        malformed = Some(e);
                    }
                }
            }
        }

        let failure = match malformed {
            Some(e) => AttemptFailure::Malformed(e),
            None if received == 0 => AttemptFailure::ReceiveEmpty,
            None => AttemptFailure::ReceiveTimeout { received },
        };
        Err(failure.into())
    }
}
