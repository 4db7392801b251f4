//! The link aggregate: one negotiated session with a remote game host.
//!
//! A [`Link`] owns the reliable channel, the optional unreliable channel,
//! and the session state; nothing else mutates them. All operations run on
//! the caller's task — there is no background work, so if the caller never
//! calls [`Link::receive`] no frames are processed and the frame buffer's
//! capacity becomes natural back-pressure against the host.

use std::time::{Duration, Instant};

use volley_config::NetworkConfig;
use volley_wire::{Frame, FrameBuffer, HEADER_LEN, MAX_FRAME_LEN, OversizedFrame, decode_header, encode_frame};

use crate::handshake::{self, ConnectError, SessionState};
use crate::messages::{
    MSG_UDP_LINK_ESTABLISHED, MSG_UDP_LINK_REQUEST, Message, PlayerId, is_speed_sensitive,
};
use crate::recorder::{Direction, FrameObserver};
use crate::stats::{LinkStats, StatsSnapshot};
use crate::tcp::{RecvStatus, ReliableChannel, Wait};
use crate::udp::UnreliableChannel;

/// Errors surfaced by [`Link::send`] and [`Link::receive`] after the
/// handshake. Apart from [`LinkError::PayloadTooLarge`], which refuses one
/// send and leaves the session alone, every error here has already moved
/// the session into the terminal state it reports; the link must be torn
/// down and recreated.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The session is in a terminal state from an earlier failure.
    #[error("session is not active (state {0:?})")]
    NotActive(SessionState),

    /// The caller handed `send` a payload that cannot fit in one frame.
    /// The send is refused; nothing reaches the wire and the session is
    /// unaffected.
    #[error("payload of {len} bytes exceeds the frame ceiling of {max} bytes")]
    PayloadTooLarge {
        /// Payload size the caller asked for.
        len: usize,
        /// Whole-frame ceiling (header included).
        max: usize,
    },

    /// Reliable-channel I/O failed.
    #[error("transport failure: {0}")]
    Transport(#[source] std::io::Error),

    /// The reliable stream produced an impossible frame header. The stream
    /// has desynchronized; waiting cannot recover it.
    #[error(transparent)]
    Malformed(#[from] OversizedFrame),

    /// The host closed an active session cleanly.
    #[error("host closed the connection")]
    PeerClosed,
}

/// One end-to-end session with a game host.
pub struct Link {
    tcp: ReliableChannel,
    buffer: FrameBuffer,
    state: SessionState,
    identity: PlayerId,
    version: [u8; 8],
    udp: Option<UnreliableChannel>,
    /// Host confirmed it receives our datagrams (uplink proven).
    udp_send_enabled: bool,
    /// We received host datagrams (downlink proven). Independent of
    /// `udp_send_enabled`; either direction can complete first. Both are
    /// monotonic for the life of the session.
    udp_established: bool,
    stats: LinkStats,
    observer: Option<FrameObserver>,
    started: Instant,
}

impl Link {
    /// Run the handshake against `addr` and return an active link.
    ///
    /// All handshake failures surface here, classified; this layer never
    /// retries. When the config enables it, the unreliable upgrade probe is
    /// sent before returning; its completion is observed during normal
    /// [`receive`](Self::receive) traffic.
    pub async fn connect(
        addr: std::net::SocketAddr,
        config: &NetworkConfig,
    ) -> Result<Self, ConnectError> {
        let negotiated =
            handshake::negotiate(addr, Duration::from_secs(config.connect_timeout_secs.into()))
                .await?;

        let mut link = Self {
            tcp: negotiated.channel,
            buffer: FrameBuffer::new(),
            state: SessionState::Active,
            identity: negotiated.identity,
            version: negotiated.version,
            udp: None,
            udp_send_enabled: false,
            udp_established: false,
            stats: LinkStats::new(),
            observer: None,
            started: Instant::now(),
        };
        tracing::info!(identity = link.identity, "session active");

        if config.udp_enabled {
            link.request_udp_upgrade().await;
        }
        Ok(link)
    }

    /// Resolve the host named in `config` and connect to it. First address
    /// wins; game hosts are addressed singly, not by address family
    /// preference lists.
    pub async fn connect_to_host(config: &NetworkConfig) -> Result<Self, ConnectError> {
        let mut addrs =
            tokio::net::lookup_host((config.server_address.as_str(), config.server_port)).await?;
        let addr = addrs.next().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host name resolved to no addresses",
            )
        })?;
        Self::connect(addr, config).await
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity the host assigned during the handshake.
    pub fn identity(&self) -> PlayerId {
        self.identity
    }

    /// Version tag the host confirmed.
    pub fn version(&self) -> &[u8; 8] {
        &self.version
    }

    /// Snapshot of the session traffic counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// True once host datagrams have been observed (downlink proven).
    pub fn udp_established(&self) -> bool {
        self.udp_established
    }

    /// True once the host confirmed receiving our datagrams (uplink proven).
    pub fn udp_send_enabled(&self) -> bool {
        self.udp_send_enabled
    }

    /// Install a tee invoked with every reliable-channel frame, both
    /// directions. See [`crate::recorder`].
    pub fn set_frame_observer(&mut self, observer: FrameObserver) {
        self.observer = Some(observer);
    }

    /// Send one message. A no-op unless the session is `Active`.
    ///
    /// Speed-sensitive codes ride the unreliable channel once both upgrade
    /// directions are proven; everything else is appended to the reliable
    /// stream. Datagram send failures are silently dropped (the channel is
    /// allowed to lose frames); reliable failures are fatal to the session.
    pub async fn send(&mut self, code: u16, payload: &[u8]) -> Result<(), LinkError> {
        if self.state != SessionState::Active {
            tracing::trace!(code, state = ?self.state, "send ignored, session not active");
            return Ok(());
        }
        if payload.len() + HEADER_LEN > MAX_FRAME_LEN {
            return Err(LinkError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_FRAME_LEN,
            });
        }
        let wire = encode_frame(code, payload);

        // The upgrade request is itself the bootstrap probe: it always goes
        // out as a datagram, whatever the channel state.
        let udp_ready =
            self.udp.is_some() && self.udp_established && self.udp_send_enabled;
        if code == MSG_UDP_LINK_REQUEST || (is_speed_sensitive(code) && udp_ready) {
            if let Some(udp) = &self.udp {
                match udp.send_datagram(&wire).await {
                    Ok(n) => self.stats.record_datagram_sent(n),
                    Err(e) => tracing::trace!(code, error = %e, "datagram dropped"),
                }
            }
            return Ok(());
        }

        self.send_reliable(&wire).await
    }

    /// Receive one message.
    ///
    /// The unreliable channel is polled first — state updates are only
    /// worth delivering fresh. Blocking waits multiplex over both sockets,
    /// so a datagram arriving mid-wait wakes the call even when the
    /// reliable stream is quiet. With a bounded wait, a partial frame
    /// yields `Ok(None)` and the caller retries on its own schedule; with
    /// [`Wait::Forever`] the loop runs until a message or a hard error.
    pub async fn receive(&mut self, wait: Wait) -> Result<Option<Message>, LinkError> {
        match self.state {
            SessionState::Active => {}
            SessionState::PeerClosed => return Err(LinkError::PeerClosed),
            state => return Err(LinkError::NotActive(state)),
        }

        let deadline = match wait {
            Wait::For(duration) => Some(Instant::now() + duration),
            _ => None,
        };

        loop {
            if let Some(message) = self.poll_datagram().await? {
                return Ok(Some(message));
            }

            match self.buffer.try_extract() {
                Ok(Some(frame)) => return Ok(Some(self.deliver_reliable(frame))),
                Ok(None) => {}
                Err(e) => {
                    self.state = SessionState::TransportFailure;
                    return Err(LinkError::Malformed(e));
                }
            }

            let mut chunk = [0u8; MAX_FRAME_LEN];
            let room = self.buffer.remaining_capacity().min(chunk.len());
            if room == 0 {
                // Consumer stopped draining; stop reading (back-pressure).
                return Ok(None);
            }

            match self.tcp.recv_bytes(&mut chunk[..room], Wait::NoWait).await {
                Ok(RecvStatus::Received(n)) => {
                    self.buffer.fill(&chunk[..n]);
                    if wait != Wait::Forever {
                        // One fill attempt per call when not blocking forever.
                        return match self.buffer.try_extract() {
                            Ok(Some(frame)) => Ok(Some(self.deliver_reliable(frame))),
                            Ok(None) => Ok(None),
                            Err(e) => {
                                self.state = SessionState::TransportFailure;
                                Err(LinkError::Malformed(e))
                            }
                        };
                    }
                    continue;
                }
                Ok(RecvStatus::WouldBlock) => {}
                Ok(RecvStatus::Closed) => {
                    self.state = SessionState::PeerClosed;
                    return Err(LinkError::PeerClosed);
                }
                Err(e) => {
                    self.state = SessionState::TransportFailure;
                    return Err(LinkError::Transport(e));
                }
            }

            // Neither channel had anything; block per `wait`.
            let limit = match (wait, deadline) {
                (Wait::NoWait, _) => return Ok(None),
                (_, Some(deadline)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    Some(remaining)
                }
                (_, None) => None,
            };
            if !self.wait_for_traffic(limit).await? {
                return Ok(None);
            }
        }
    }

    /// Block until either channel reports traffic, up to `limit`.
    /// `Ok(false)` means the limit expired first. Readiness can be
    /// spurious; the caller re-polls and comes back.
    async fn wait_for_traffic(&mut self, limit: Option<Duration>) -> Result<bool, LinkError> {
        let ready = async {
            match &self.udp {
                Some(udp) => tokio::select! {
                    r = self.tcp.readable() => r,
                    r = udp.readable() => r,
                },
                None => self.tcp.readable().await,
            }
        };
        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, ready).await {
                Ok(outcome) => outcome,
                Err(_) => return Ok(false),
            },
            None => ready.await,
        };
        match outcome {
            Ok(()) => Ok(true),
            Err(e) => {
                self.state = SessionState::TransportFailure;
                Err(LinkError::Transport(e))
            }
        }
    }

    /// Open the local datagram endpoint and send the upgrade probe.
    ///
    /// Failures here are never fatal: the session simply stays on the
    /// reliable channel. Completion of either upgrade direction is noticed
    /// during [`receive`](Self::receive).
    pub async fn request_udp_upgrade(&mut self) {
        if self.state != SessionState::Active || self.udp.is_some() {
            return;
        }

        let (local, peer) = match (self.tcp.local_addr(), self.tcp.peer_addr()) {
            (Ok(local), Ok(peer)) => (local, peer),
            _ => {
                tracing::warn!("cannot resolve endpoints for datagram upgrade");
                return;
            }
        };

        match UnreliableChannel::open(local, peer).await {
            Ok(channel) => {
                if let Ok(port) = channel.local_port() {
                    tracing::info!(port, "opened local datagram endpoint");
                }
                self.udp = Some(channel);
                let identity = self.identity;
                // Forced onto the datagram path by `send`; cannot fail.
                let _ = self.send(MSG_UDP_LINK_REQUEST, &[identity]).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "datagram upgrade unavailable, staying on reliable channel");
            }
        }
    }

    /// Tear the session down: close the datagram endpoint and shut the
    /// reliable stream down in an orderly way. Dropping the link closes
    /// both channels too; this just sends FIN eagerly.
    pub async fn close(mut self) {
        self.udp = None;
        if let Err(e) = self.tcp.close().await {
            tracing::debug!(error = %e, "stream shutdown during close failed");
        }
    }

    async fn send_reliable(&mut self, wire: &[u8]) -> Result<(), LinkError> {
        if let Some(observer) = &mut self.observer {
            observer(Direction::Outbound, self.started.elapsed(), wire);
        }
        match self.tcp.send_bytes(wire).await {
            Ok(()) => {
                self.stats.record_reliable_sent(wire.len());
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::TransportFailure;
                Err(LinkError::Transport(e))
            }
        }
    }

    /// Poll the unreliable channel for one datagram. Datagram-path errors
    /// are swallowed: a bad datagram is dropped, never fatal.
    async fn poll_datagram(&mut self) -> Result<Option<Message>, LinkError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let received = {
            let Some(udp) = &self.udp else {
                return Ok(None);
            };
            match udp.try_recv(&mut buf) {
                Ok(received) => received,
                Err(e) => {
                    tracing::trace!(error = %e, "datagram receive error ignored");
                    None
                }
            }
        };
        let Some((n, _from)) = received else {
            return Ok(None);
        };
        self.stats.record_datagram_received(n);

        // Any inbound datagram proves the downlink works.
        self.note_downlink_established().await?;

        if n < HEADER_LEN {
            tracing::trace!(len = n, "runt datagram dropped");
            return Ok(None);
        }
        let (len, code) = decode_header([buf[0], buf[1], buf[2], buf[3]]);
        let len = len as usize;
        if HEADER_LEN + len > n {
            tracing::trace!(declared = len, actual = n, "truncated datagram dropped");
            return Ok(None);
        }

        if code == MSG_UDP_LINK_ESTABLISHED {
            self.note_uplink_confirmed();
        }

        Ok(Some(Message {
            code,
            payload: buf[HEADER_LEN..HEADER_LEN + len].to_vec(),
        }))
    }

    /// First host datagram observed: mark the downlink proven (monotonic)
    /// and tell the host so over the reliable channel — the confirmation
    /// itself must not be lost.
    async fn note_downlink_established(&mut self) -> Result<(), LinkError> {
        if self.udp_established {
            return Ok(());
        }
        self.udp_established = true;
        tracing::info!("host datagrams arriving, downlink confirmed");
        let wire = encode_frame(MSG_UDP_LINK_ESTABLISHED, &[]);
        self.send_reliable(&wire).await
    }

    /// Host confirmed receiving our datagrams: uplink proven (monotonic).
    fn note_uplink_confirmed(&mut self) {
        if !self.udp_send_enabled {
            self.udp_send_enabled = true;
            tracing::info!("host receives our datagrams, routing state updates unreliably");
        }
    }

    fn deliver_reliable(&mut self, frame: Frame) -> Message {
        let wire = encode_frame(frame.code, &frame.payload);
        self.stats.record_reliable_received(wire.len());
        if let Some(observer) = &mut self.observer {
            observer(Direction::Inbound, self.started.elapsed(), &wire);
        }
        if frame.code == MSG_UDP_LINK_ESTABLISHED {
            self.note_uplink_confirmed();
        }
        frame
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        let snap = self.stats.snapshot();
        tracing::debug!(
            elapsed = ?snap.elapsed,
            reliable_frames_sent = snap.reliable_frames_sent,
            reliable_frames_received = snap.reliable_frames_received,
            datagrams_sent = snap.datagrams_sent,
            datagrams_received = snap.datagrams_received,
            "link closed"
        );
    }
}
