//! Connection and message transport for the Volley game client.
//!
//! One [`Link`] owns a negotiated session with a single remote game host:
//! an ordered reliable TCP channel carrying length-prefixed frames, plus an
//! opportunistic unreliable UDP channel that activates mid-session for
//! latency-sensitive traffic.

pub mod game;
pub mod handshake;
pub mod link;
pub mod messages;
pub mod platform;
pub mod recorder;
pub mod stats;
pub mod tcp;
pub mod udp;

pub use game::{JoinError, PlayerClass, Team};
pub use handshake::{ConnectError, SessionState};
pub use link::{Link, LinkError};
pub use messages::{Message, PlayerId};
pub use recorder::{Direction, FrameObserver};
pub use stats::StatsSnapshot;
pub use tcp::{RecvStatus, ReliableChannel, Wait};
pub use udp::UnreliableChannel;
