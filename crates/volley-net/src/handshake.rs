//! Session handshake: takes a raw TCP connection to an active session or a
//! terminal failure classification.
//!
//! Sequence: connect (bounded) → send the connect preamble → wait for the
//! host's 8-byte version tag (wallclock deadline, polled in short slices) →
//! classify refusal / mismatch / match → read the 1-byte session identity →
//! switch to low latency. The version read and its comparison happen before
//! any attempt to read an identity, because a refusing host may close the
//! moment it has sent its refusal.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;

use volley_wire::WireReader;

use crate::messages::{PlayerId, REJECTED_ID};
use crate::platform::SocketConfig;
use crate::tcp::{RecvStatus, ReliableChannel, Wait};

/// 8-byte ASCII token sent immediately on connect, identifying this as a
/// Volley protocol client. Sent before anything is awaited.
pub const CONNECT_PREAMBLE: &[u8; 8] = b"VOLLEY\r\n";

/// Version tag this client speaks. Compared byte-for-byte.
pub const EXPECTED_VERSION: &[u8; 8] = b"VLSV0108";

/// Distinguished tag a host sends instead of a version when it actively
/// refuses the connection. Followed by a length-prefixed reason string.
pub const REFUSAL_TAG: &[u8; 8] = b"REFUSED!";

/// Ceiling on establishing the TCP socket itself.
const CONNECT_SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Ceiling on the post-version reads (identity byte, refusal reason).
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll slice inside the version wait loop.
const POLL_SLICE: Duration = Duration::from_millis(250);

/// Lifecycle of one session. Exactly one state is current at any time;
/// every state except `Establishing` and `Active` is terminal: the session
/// is permanently unusable and must be torn down and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Establishing,
    /// Handshake complete; the link is usable.
    Active,
    /// The host explicitly declined the connection.
    Rejected,
    /// The host speaks a different protocol version.
    ProtocolMismatch,
    /// Socket/connect/I-O error, malformed frame, or timeout.
    TransportFailure,
    /// The host closed a previously active session cleanly.
    PeerClosed,
}

impl SessionState {
    /// True once the session can never become usable again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Establishing | SessionState::Active)
    }
}

/// Why a connect attempt failed. Surfaced synchronously from
/// [`Link::connect`](crate::Link::connect); this layer never retries.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Socket error or stream closed mid-handshake.
    #[error("transport failure during connect: {0}")]
    Transport(#[from] io::Error),

    /// No response within the configured deadline.
    #[error("no response from host within {0:?}")]
    TimedOut(Duration),

    /// The host offered a version tag other than [`EXPECTED_VERSION`].
    #[error("protocol version mismatch: host offered {offered:?}, expected {expected:?}")]
    ProtocolMismatch {
        /// Tag the host sent, lossily decoded for display.
        offered: String,
        /// Tag this client expected.
        expected: String,
    },

    /// The host explicitly declined the connection.
    #[error("connection rejected by host: {}", reason.as_deref().unwrap_or("no reason given"))]
    Rejected {
        /// Human-readable reason, when the host supplied one.
        reason: Option<String>,
    },
}

impl ConnectError {
    /// The terminal session state this failure classifies into.
    pub fn terminal_state(&self) -> SessionState {
        match self {
            ConnectError::Transport(_) | ConnectError::TimedOut(_) => SessionState::TransportFailure,
            ConnectError::ProtocolMismatch { .. } => SessionState::ProtocolMismatch,
            ConnectError::Rejected { .. } => SessionState::Rejected,
        }
    }
}

/// Result of a successful negotiation.
#[derive(Debug)]
pub(crate) struct Negotiated {
    /// The channel, already switched to low-latency mode.
    pub channel: ReliableChannel,
    /// Identity the host assigned to this session.
    pub identity: PlayerId,
    /// Version tag the host confirmed.
    pub version: [u8; 8],
}

/// Run the full handshake against `addr`.
///
/// `version_timeout` bounds the wait for the version tag (wallclock,
/// configured, default 30 s); the socket connect and the later short reads
/// have fixed internal ceilings.
pub(crate) async fn negotiate(
    addr: SocketAddr,
    version_timeout: Duration,
) -> Result<Negotiated, ConnectError> {
    let mut channel = ReliableChannel::connect_with_timeout(addr, CONNECT_SOCKET_TIMEOUT).await?;
    tracing::debug!(%addr, "connected, sending preamble");

    // Unconditional: the host learns our protocol before saying anything.
    channel.send_bytes(CONNECT_PREAMBLE).await?;

    let mut version = [0u8; 8];
    read_exact_by(&mut channel, &mut version, version_timeout).await?;

    if &version == REFUSAL_TAG {
        let reason = read_refusal_reason(&mut channel).await;
        tracing::warn!(?reason, "host refused the connection");
        return Err(ConnectError::Rejected { reason });
    }

    if &version != EXPECTED_VERSION {
        tracing::warn!(
            offered = %String::from_utf8_lossy(&version),
            "host protocol version does not match"
        );
        return Err(ConnectError::ProtocolMismatch {
            offered: String::from_utf8_lossy(&version).into_owned(),
            expected: String::from_utf8_lossy(EXPECTED_VERSION).into_owned(),
        });
    }

    let mut identity = [0u8; 1];
    read_exact_by(&mut channel, &mut identity, RESPONSE_TIMEOUT).await?;
    if identity[0] == REJECTED_ID {
        tracing::warn!("host rejected the session, no identity issued");
        return Err(ConnectError::Rejected { reason: None });
    }

    // All traffic from here on is latency-sensitive game state.
    channel.set_low_latency(&SocketConfig::default())?;
    tracing::debug!(identity = identity[0], "handshake complete");

    Ok(Negotiated {
        channel,
        identity: identity[0],
        version,
    })
}

/// Read exactly `buf.len()` bytes, polling in short slices against a
/// wallclock deadline. A clean close before the buffer fills is a
/// transport failure: the host hung up mid-handshake.
async fn read_exact_by(
    channel: &mut ReliableChannel,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<(), ConnectError> {
    let deadline = Instant::now() + timeout;
    let mut filled = 0;

    while filled < buf.len() {
        if Instant::now() >= deadline {
            return Err(ConnectError::TimedOut(timeout));
        }
        match channel
            .recv_bytes(&mut buf[filled..], Wait::For(POLL_SLICE))
            .await?
        {
            RecvStatus::Received(n) => filled += n,
            RecvStatus::WouldBlock => continue,
            RecvStatus::Closed => {
                return Err(ConnectError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "host closed the stream during handshake",
                )));
            }
        }
    }
    Ok(())
}

/// After a refusal tag, the host sends a `u16` length and that many bytes
/// of human-readable reason. The host may close right after, so any
/// failure here degrades to "no reason" rather than masking the refusal.
async fn read_refusal_reason(channel: &mut ReliableChannel) -> Option<String> {
    let mut len_buf = [0u8; 2];
    if read_exact_by(channel, &mut len_buf, RESPONSE_TIMEOUT).await.is_err() {
        return None;
    }
    let len = WireReader::new(&len_buf).get_u16() as usize;
    if len == 0 {
        return None;
    }

    let mut reason = vec![0u8; len];
    if read_exact_by(channel, &mut reason, RESPONSE_TIMEOUT).await.is_err() {
        return None;
    }
    Some(String::from_utf8_lossy(&reason).into_owned())
}
