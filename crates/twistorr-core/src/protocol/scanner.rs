//! Reply extraction from a byte stream
//!
//! Serial reads arrive in arbitrary chunk sizes. The scanner accumulates
//! them and cuts out every complete `STX … ETX C1 C0` frame, discarding
//! bytes that cannot belong to a frame. Incomplete trailing bytes stay
//! buffered for the next [`StreamScanner::feed`].

use bytes::{Buf, Bytes, BytesMut};

use super::{decode, ControlByte, FrameError, Reply, MAX_FRAME_SIZE};

const STX: u8 = ControlByte::Stx.byte();
const ETX: u8 = ControlByte::Etx.byte();

/// Remove the leftmost complete frame from `buf`.
///
/// Noise before the frame is dropped. When an ETX is preceded by more than
/// one STX, the earlier STX opened a truncated frame and is dropped too.
/// Returns `None` when no complete frame is buffered yet.
pub fn extract_frame(buf: &mut BytesMut) -> Option<Bytes> {
    loop {
        match buf.iter().position(|&b| b == STX) {
            None => {
                buf.clear();
                return None;
            }
            Some(start) => buf.advance(start),
        }

        let Some(etx) = buf.iter().position(|&b| b == ETX) else {
            if buf.len() > MAX_FRAME_SIZE {
                // No terminator within a frame's length: resync on the next STX
                buf.advance(1);
                continue;
            }
            return None;
        };

        // buf[0] is STX, so this is at least 0
        let last_stx = buf[..etx].iter().rposition(|&b| b == STX).unwrap_or(0);
        if last_stx > 0 {
            buf.advance(last_stx);
            continue;
        }

        if buf.len() < etx + 3 {
            return None;
        }
        return Some(buf.split_to(etx + 3).freeze());
    }
}

/// Accumulates reply bytes and yields decoded frames
#[derive(Debug, Default)]
pub struct StreamScanner {
    buffer: BytesMut,
}

impl StreamScanner {
    /// Create an empty scanner
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Append `data` and return every frame completed by it, in arrival order.
    ///
    /// Malformed frames are returned as errors rather than skipped so the
    /// caller can tell noise apart from a garbled reply.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<Reply, FrameError>> {
        self.buffer.extend_from_slice(data);

        let mut replies = Vec::new();
        while let Some(frame) = extract_frame(&mut self.buffer) {
            replies.push(decode(&frame));
        }
        replies
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop any buffered bytes
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
