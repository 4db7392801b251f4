//! Wire format for the Volley game protocol: byte-order codec, message
//! framing, and the receive-side frame reassembly buffer. Pure data
//! handling, no I/O.

pub mod buffer;
pub mod codec;
pub mod frame;

pub use buffer::{FrameBuffer, OversizedFrame};
pub use codec::{WireReader, WireWriter};
pub use frame::{Frame, HEADER_LEN, MAX_FRAME_LEN, decode_header, encode_frame};
