//! Receive-side frame reassembly for the reliable byte stream.
//!
//! TCP reads can split one frame across several reads or coalesce several
//! frames into one. [`FrameBuffer`] accumulates raw bytes and hands back
//! complete frames, leaving partial data in place for the next fill.

use crate::frame::{Frame, HEADER_LEN, MAX_FRAME_LEN};

/// Buffer capacity: four frames' worth of headroom over the ceiling.
const CAPACITY: usize = MAX_FRAME_LEN * 4;

/// Fatal framing error: a header declared a length the protocol can never
/// produce. The stream offset is unrecoverable; waiting for more bytes
/// cannot fix it, so the session must be torn down.
#[derive(Debug, thiserror::Error)]
#[error("frame length {declared} exceeds maximum {max}")]
pub struct OversizedFrame {
    /// The whole-frame length the header declared (payload + header).
    pub declared: usize,
    /// The ceiling it violated.
    pub max: usize,
}

/// Accumulates stream bytes and extracts complete length-prefixed frames.
///
/// Two cursors: `write_pos` (next empty byte) and `consumed` (bytes already
/// parsed into delivered frames). Invariant:
/// `0 <= consumed <= write_pos <= CAPACITY`.
pub struct FrameBuffer {
    buf: Box<[u8; CAPACITY]>,
    write_pos: usize,
    consumed: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; CAPACITY]),
            write_pos: 0,
            consumed: 0,
        }
    }

    /// Discard already-consumed bytes by shifting the live region
    /// `[consumed, write_pos)` down to offset 0. No-op when `consumed == 0`.
    pub fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        self.buf.copy_within(self.consumed..self.write_pos, 0);
        self.write_pos -= self.consumed;
        self.consumed = 0;
    }

    /// Space left for new bytes after compaction. Zero means the consumer
    /// has stopped draining frames and the channel must stop reading
    /// (natural back-pressure).
    pub fn remaining_capacity(&mut self) -> usize {
        self.compact();
        CAPACITY - self.write_pos
    }

    /// Append newly read bytes, up to remaining capacity. Returns how many
    /// bytes were taken; the rest stay with the caller.
    pub fn fill(&mut self, data: &[u8]) -> usize {
        self.compact();
        let take = data.len().min(CAPACITY - self.write_pos);
        self.buf[self.write_pos..self.write_pos + take].copy_from_slice(&data[..take]);
        self.write_pos += take;
        take
    }

    /// Bytes available but not yet parsed.
    pub fn unconsumed(&self) -> usize {
        self.write_pos - self.consumed
    }

    /// Try to extract the next complete frame.
    ///
    /// - `Ok(None)`: not enough bytes yet for a header or for the declared
    ///   payload; call [`fill`](Self::fill) again when more data arrives.
    /// - `Ok(Some(frame))`: one frame extracted, cursors advanced.
    /// - `Err(OversizedFrame)`: the declared length violates
    ///   [`MAX_FRAME_LEN`]. Fatal; never returned as a "wait for more" case
    ///   no matter how many bytes are buffered.
    pub fn try_extract(&mut self) -> Result<Option<Frame>, OversizedFrame> {
        let available = self.unconsumed();
        if available < HEADER_LEN {
            return Ok(None);
        }

        let header = &self.buf[self.consumed..self.consumed + HEADER_LEN];
        let len = u16::from_be_bytes([header[0], header[1]]) as usize;
        let code = u16::from_be_bytes([header[2], header[3]]);

        if len + HEADER_LEN > MAX_FRAME_LEN {
            return Err(OversizedFrame {
                declared: len + HEADER_LEN,
                max: MAX_FRAME_LEN,
            });
        }

        if available < HEADER_LEN + len {
            return Ok(None);
        }

        let start = self.consumed + HEADER_LEN;
        let payload = self.buf[start..start + len].to_vec();
        self.consumed += HEADER_LEN + len;

        Ok(Some(Frame { code, payload }))
    }
}
