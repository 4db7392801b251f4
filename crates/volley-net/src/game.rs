//! Typed game senders: payload builders layered on [`Link::send`].
//!
//! The link itself moves opaque frames; the wire layouts of the individual
//! game messages live here, built with the wire codec. Fixed-width string
//! fields are null-padded and truncated at the declared width, so the host
//! can unpack them at fixed offsets.

use volley_wire::{WireReader, WireWriter};

use crate::link::{Link, LinkError};
use crate::messages::{
    MSG_ACCEPT, MSG_ALIVE, MSG_AUTOPILOT, MSG_CAPTURE_FLAG, MSG_DROP_FLAG, MSG_ENTER,
    MSG_GRAB_FLAG, MSG_KILLED, MSG_PAUSE, MSG_REJECT, MSG_SHOT_BEGIN, MSG_SHOT_END,
    MSG_SUPER_KILL, MSG_TELEPORT, PlayerId,
};
use crate::tcp::Wait;

/// Width of the callsign field in the enter request.
pub const CALLSIGN_LEN: usize = 32;
/// Width of the motto field in the enter request.
pub const MOTTO_LEN: usize = 128;
/// Width of the authentication-token field in the enter request.
pub const TOKEN_LEN: usize = 22;

/// What kind of participant is entering the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PlayerClass {
    /// A human-driven tank.
    Tank = 0,
    /// A computer-driven tank.
    Computer = 1,
}

/// Team the player asks to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Team {
    /// No team; everyone is an enemy.
    Rogue = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Purple = 4,
    /// Watching only; never spawns.
    Observer = 5,
}

/// Why joining the game failed after a successful connection.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The host declined the enter request.
    #[error("host rejected the enter request (code {code}): {reason}")]
    Rejected {
        /// Host-defined rejection code.
        code: u16,
        /// Human-readable reason.
        reason: String,
    },

    /// The host ordered an immediate disconnect while we waited.
    #[error("host ordered an immediate disconnect")]
    Ejected,

    /// The session failed underneath the join.
    #[error(transparent)]
    Link(#[from] LinkError),
}

impl Link {
    /// Ask to join the game. The answer arrives later; wait for it with
    /// [`read_enter`](Self::read_enter).
    pub async fn send_enter(
        &mut self,
        class: PlayerClass,
        team: Team,
        callsign: &str,
        motto: &str,
        token: &str,
    ) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(4 + CALLSIGN_LEN + MOTTO_LEN + TOKEN_LEN);
        w.put_u16(class as u16)
            .put_u16(team as u16)
            .put_fixed_str(callsign, CALLSIGN_LEN)
            .put_fixed_str(motto, MOTTO_LEN)
            .put_fixed_str(token, TOKEN_LEN);
        self.send(MSG_ENTER, &w.into_bytes()).await
    }

    /// Block until the host answers the enter request.
    ///
    /// The host may interleave unrelated traffic (chat, scores) before the
    /// verdict; those messages are skipped here, which matches the join
    /// screen's needs — game state only matters once we are in.
    pub async fn read_enter(&mut self) -> Result<(), JoinError> {
        loop {
            let Some(message) = self.receive(Wait::Forever).await? else {
                continue;
            };
            match message.code {
                MSG_ACCEPT => return Ok(()),
                MSG_REJECT => {
                    let mut r = WireReader::new(&message.payload);
                    let code = r.get_u16();
                    let reason = String::from_utf8_lossy(r.get_bytes(r.remaining())).into_owned();
                    return Err(JoinError::Rejected { code, reason });
                }
                MSG_SUPER_KILL => return Err(JoinError::Ejected),
                other => {
                    tracing::trace!(code = other, "skipping message while waiting for enter verdict");
                }
            }
        }
    }

    /// Report ready to (re)spawn.
    pub async fn send_alive(&mut self) -> Result<(), LinkError> {
        self.send(MSG_ALIVE, &[]).await
    }

    /// Report being killed: by whom, why, and with which shot.
    pub async fn send_killed(
        &mut self,
        killer: PlayerId,
        reason: i16,
        shot_id: i16,
    ) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(5);
        w.put_u8(killer).put_i16(reason).put_i16(shot_id);
        self.send(MSG_KILLED, &w.into_bytes()).await
    }

    /// Drop the carried flag at `position`.
    pub async fn send_drop_flag(&mut self, position: [f32; 3]) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(12);
        for value in position {
            w.put_f32(value);
        }
        self.send(MSG_DROP_FLAG, &w.into_bytes()).await
    }

    /// Ask to grab flag number `flag`.
    pub async fn send_grab_flag(&mut self, flag: u16) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(2);
        w.put_u16(flag);
        self.send(MSG_GRAB_FLAG, &w.into_bytes()).await
    }

    /// Report capturing `team`'s flag.
    pub async fn send_capture_flag(&mut self, team: Team) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(2);
        w.put_u16(team as u16);
        self.send(MSG_CAPTURE_FLAG, &w.into_bytes()).await
    }

    /// Report travelling from teleporter `from` to teleporter `to`.
    pub async fn send_teleport(&mut self, from: u16, to: u16) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(4);
        w.put_u16(from).put_u16(to);
        self.send(MSG_TELEPORT, &w.into_bytes()).await
    }

    /// Announce a fired shot: id, launch position, initial velocity.
    pub async fn send_shot_begin(
        &mut self,
        shot_id: i16,
        position: [f32; 3],
        velocity: [f32; 3],
    ) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(26);
        w.put_i16(shot_id);
        for value in position {
            w.put_f32(value);
        }
        for value in velocity {
            w.put_f32(value);
        }
        self.send(MSG_SHOT_BEGIN, &w.into_bytes()).await
    }

    /// Announce a shot ending: whose shot, which one, and why.
    pub async fn send_shot_end(
        &mut self,
        source: PlayerId,
        shot_id: i16,
        reason: i16,
    ) -> Result<(), LinkError> {
        let mut w = WireWriter::with_capacity(5);
        w.put_u8(source).put_i16(shot_id).put_i16(reason);
        self.send(MSG_SHOT_END, &w.into_bytes()).await
    }

    /// Report the local pause state.
    pub async fn send_paused(&mut self, paused: bool) -> Result<(), LinkError> {
        self.send(MSG_PAUSE, &[paused as u8]).await
    }

    /// Report the autopilot toggling on or off.
    pub async fn send_autopilot(&mut self, enabled: bool) -> Result<(), LinkError> {
        self.send(MSG_AUTOPILOT, &[enabled as u8]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use volley_config::NetworkConfig;
    use volley_wire::{Frame, HEADER_LEN, decode_header, encode_frame};

    use crate::handshake::{CONNECT_PREAMBLE, EXPECTED_VERSION};
    use crate::messages::MSG_CHAT;

    async fn connected_pair() -> (Link, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut preamble = [0u8; 8];
            stream.read_exact(&mut preamble).await.unwrap();
            assert_eq!(&preamble, CONNECT_PREAMBLE);
            stream.write_all(EXPECTED_VERSION).await.unwrap();
            stream.write_all(&[3u8]).await.unwrap();
            stream
        });

        let config = NetworkConfig {
            udp_enabled: false,
            connect_timeout_secs: 5,
            ..Default::default()
        };
        let link = Link::connect(addr, &config).await.unwrap();
        (link, server.await.unwrap())
    }

    async fn read_frame(stream: &mut TcpStream) -> Frame {
        let mut header = [0u8; HEADER_LEN];
        stream.read_exact(&mut header).await.unwrap();
        let (len, code) = decode_header(header);
        let mut payload = vec![0u8; len as usize];
        stream.read_exact(&mut payload).await.unwrap();
        Frame { code, payload }
    }

    #[tokio::test]
    async fn test_enter_payload_layout() {
        let (mut link, mut server) = connected_pair().await;

        link.send_enter(PlayerClass::Tank, Team::Blue, "rook", "fresh meat", "tok")
            .await
            .unwrap();

        let frame = read_frame(&mut server).await;
        assert_eq!(frame.code, MSG_ENTER);
        assert_eq!(frame.payload.len(), 4 + CALLSIGN_LEN + MOTTO_LEN + TOKEN_LEN);

        let mut r = WireReader::new(&frame.payload);
        assert_eq!(r.get_u16(), PlayerClass::Tank as u16);
        assert_eq!(r.get_u16(), Team::Blue as u16);
        assert_eq!(r.get_fixed_str(CALLSIGN_LEN), "rook");
        assert_eq!(r.get_fixed_str(MOTTO_LEN), "fresh meat");
        assert_eq!(r.get_fixed_str(TOKEN_LEN), "tok");
        assert_eq!(r.remaining(), 0);
    }

    #[tokio::test]
    async fn test_enter_truncates_oversized_callsign() {
        let (mut link, mut server) = connected_pair().await;

        let long = "x".repeat(CALLSIGN_LEN + 10);
        link.send_enter(PlayerClass::Computer, Team::Rogue, &long, "", "")
            .await
            .unwrap();

        let frame = read_frame(&mut server).await;
        assert_eq!(frame.payload.len(), 4 + CALLSIGN_LEN + MOTTO_LEN + TOKEN_LEN);
        let mut r = WireReader::new(&frame.payload);
        r.get_u16();
        r.get_u16();
        assert_eq!(r.get_fixed_str(CALLSIGN_LEN).len(), CALLSIGN_LEN);
    }

    #[tokio::test]
    async fn test_read_enter_skips_chatter_until_accept() {
        let (mut link, mut server) = connected_pair().await;

        server.write_all(&encode_frame(MSG_CHAT, b"welcome")).await.unwrap();
        server.write_all(&encode_frame(MSG_ACCEPT, &[])).await.unwrap();

        link.read_enter().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_enter_reject_carries_code_and_reason() {
        let (mut link, mut server) = connected_pair().await;

        let mut w = WireWriter::new();
        w.put_u16(2).put_bytes(b"callsign in use");
        server
            .write_all(&encode_frame(MSG_REJECT, &w.into_bytes()))
            .await
            .unwrap();

        let err = link.read_enter().await.unwrap_err();
        match err {
            JoinError::Rejected { code, reason } => {
                assert_eq!(code, 2);
                assert_eq!(reason, "callsign in use");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_enter_super_kill_is_ejection() {
        let (mut link, mut server) = connected_pair().await;

        server.write_all(&encode_frame(MSG_SUPER_KILL, &[])).await.unwrap();

        let err = link.read_enter().await.unwrap_err();
        assert!(matches!(err, JoinError::Ejected), "got {err:?}");
    }

    #[tokio::test]
    async fn test_drop_flag_position_is_bit_exact() {
        let (mut link, mut server) = connected_pair().await;

        let position = [1.5f32, -2.25, 0.125];
        link.send_drop_flag(position).await.unwrap();

        let frame = read_frame(&mut server).await;
        assert_eq!(frame.code, MSG_DROP_FLAG);
        let mut r = WireReader::new(&frame.payload);
        for expected in position {
            assert_eq!(r.get_f32().to_bits(), expected.to_bits());
        }
    }

    #[tokio::test]
    async fn test_killed_and_shot_end_layouts() {
        let (mut link, mut server) = connected_pair().await;

        link.send_killed(9, -1, 4).await.unwrap();
        let frame = read_frame(&mut server).await;
        assert_eq!(frame.code, MSG_KILLED);
        let mut r = WireReader::new(&frame.payload);
        assert_eq!(r.get_u8(), 9);
        assert_eq!(r.get_i16(), -1);
        assert_eq!(r.get_i16(), 4);

        link.send_shot_end(9, 4, 1).await.unwrap();
        let frame = read_frame(&mut server).await;
        assert_eq!(frame.code, MSG_SHOT_END);
        let mut r = WireReader::new(&frame.payload);
        assert_eq!(r.get_u8(), 9);
        assert_eq!(r.get_i16(), 4);
        assert_eq!(r.get_i16(), 1);
    }

    #[tokio::test]
    async fn test_pause_and_autopilot_flag_byte() {
        let (mut link, mut server) = connected_pair().await;

        link.send_paused(true).await.unwrap();
        let frame = read_frame(&mut server).await;
        assert_eq!((frame.code, frame.payload.as_slice()), (MSG_PAUSE, &[1u8][..]));

        link.send_autopilot(false).await.unwrap();
        let frame = read_frame(&mut server).await;
        assert_eq!((frame.code, frame.payload.as_slice()), (MSG_AUTOPILOT, &[0u8][..]));
    }
}
