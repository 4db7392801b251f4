//! Message framing shared by both transport channels.
//!
//! Every message on the wire is one frame:
//!
//! ```text
//! +-------------------+-------------------+--------------------+
//! | length (2 bytes)  |  code (2 bytes)   |   payload          |
//! | u16 big-endian    |  u16 big-endian   |   (length bytes)   |
//! +-------------------+-------------------+--------------------+
//! ```
//!
//! `length` counts only the payload, not the 4 header bytes. On the
//! reliable channel frames are packed back to back in the stream; on the
//! unreliable channel each datagram carries exactly one frame.

use crate::codec::{WireReader, WireWriter};

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 4;

/// System-wide ceiling on a whole frame (`payload length + HEADER_LEN`).
/// A declared length that would exceed this means the stream has
/// desynchronized and the session cannot be recovered.
pub const MAX_FRAME_LEN: usize = 1024;

/// One decoded application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message code identifying the payload format.
    pub code: u16,
    /// Raw payload bytes, decoded by the layer that owns the code.
    pub payload: Vec<u8>,
}

/// Encode a frame into its wire form.
///
/// The caller is responsible for keeping `payload.len() + HEADER_LEN`
/// within [`MAX_FRAME_LEN`]; the send path rejects application payloads
/// that violate it, and debug builds assert it here so an internal caller
/// cannot quietly emit a header the receiver must treat as fatal (or, past
/// `u16::MAX`, a truncated length that desynchronizes the stream).
pub fn encode_frame(code: u16, payload: &[u8]) -> Vec<u8> {
    debug_assert!(
        payload.len() + HEADER_LEN <= MAX_FRAME_LEN,
        "payload of {} bytes exceeds the frame ceiling",
        payload.len()
    );
    let mut w = WireWriter::with_capacity(HEADER_LEN + payload.len());
    w.put_u16(payload.len() as u16).put_u16(code).put_bytes(payload);
    w.into_bytes()
}

/// Decode a frame header into `(payload_length, code)`.
pub fn decode_header(header: [u8; HEADER_LEN]) -> (u16, u16) {
    let mut r = WireReader::new(&header);
    (r.get_u16(), r.get_u16())
}
