//! `tokio_util` codec for async streams
//!
//! Decoding shares frame extraction with [`StreamScanner`](super::StreamScanner).
//! Encoding takes frames already produced by [`Request::encode`](super::Request::encode),
//! so validation happens once per query rather than once per attempt.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{decode, scanner::extract_frame, FrameError, Reply, TransportError};

/// Reply decoder / request frame encoder for `Framed` streams
#[derive(Debug, Clone, Copy, Default)]
pub struct TwisTorrCodec;

impl TwisTorrCodec {
    /// Create a codec
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for TwisTorrCodec {
    /// Malformed frames are items, not stream errors, so the stream stays usable
    type Item = Result<Reply, FrameError>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(extract_frame(src).map(|frame| decode(&frame)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = self.decode(buf)?;
        if item.is_none() {
            // Partial frame at end of stream is noise
            buf.clear();
        }
        Ok(item)
    }
}

impl Encoder<Bytes> for TwisTorrCodec {
    type Error = TransportError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&frame);
        Ok(())
    }
}
