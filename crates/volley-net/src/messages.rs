//! Message-code catalog and send-routing classification.
//!
//! Every frame carries a `u16` code built from a two-letter ASCII mnemonic,
//! so codes read recognizably in packet dumps. Payload layouts belong to the
//! senders in [`crate::game`]; this module only names the codes and decides
//! which ones are latency-sensitive enough to ride the unreliable channel.

use volley_wire::Frame;

/// Session identity assigned by the host during the handshake.
/// The value 255 is reserved to mean "rejected, no identity issued."
pub type PlayerId = u8;

/// Reserved identity byte: the host declined to issue one.
pub const REJECTED_ID: PlayerId = 255;

const fn code(pair: &[u8; 2]) -> u16 {
    ((pair[0] as u16) << 8) | pair[1] as u16
}

/// No message. Never sent; used as a receive-side placeholder.
pub const MSG_NULL: u16 = 0x0000;

/// Host accepted the enter request.
pub const MSG_ACCEPT: u16 = code(b"ac");
/// Player reports itself alive and ready to spawn.
pub const MSG_ALIVE: u16 = code(b"al");
/// Autopilot toggled.
pub const MSG_AUTOPILOT: u16 = code(b"au");
/// A team flag was captured.
pub const MSG_CAPTURE_FLAG: u16 = code(b"cf");
/// Player dropped the flag it was carrying.
pub const MSG_DROP_FLAG: u16 = code(b"df");
/// Enter request: join the game with identity and callsign.
pub const MSG_ENTER: u16 = code(b"en");
/// A shot ended (expired or was stopped).
pub const MSG_SHOT_END: u16 = code(b"es");
/// Player requests a flag grab.
pub const MSG_GRAB_FLAG: u16 = code(b"gf");
/// Guided-shot tracking update.
pub const MSG_GUIDED_UPDATE: u16 = code(b"gm");
/// Player was killed.
pub const MSG_KILLED: u16 = code(b"kl");
/// Chat message.
pub const MSG_CHAT: u16 = code(b"mg");
/// Pause state toggled.
pub const MSG_PAUSE: u16 = code(b"pa");
/// Full player state update.
pub const MSG_PLAYER_UPDATE: u16 = code(b"pu");
/// Compact player state update.
pub const MSG_PLAYER_UPDATE_SMALL: u16 = code(b"ps");
/// Host rejected the enter request; payload carries a reason.
pub const MSG_REJECT: u16 = code(b"rj");
/// Score update.
pub const MSG_SCORE: u16 = code(b"sc");
/// A shot was fired.
pub const MSG_SHOT_BEGIN: u16 = code(b"sb");
/// Host orders the client to disconnect immediately.
pub const MSG_SUPER_KILL: u16 = code(b"sk");
/// Flag transferred between players.
pub const MSG_TRANSFER_FLAG: u16 = code(b"tf");
/// Player went through a teleporter.
pub const MSG_TELEPORT: u16 = code(b"tp");
/// Unreliable-channel upgrade request (the bootstrap probe itself).
pub const MSG_UDP_LINK_REQUEST: u16 = code(b"of");
/// Unreliable-channel upgrade confirmed.
pub const MSG_UDP_LINK_ESTABLISHED: u16 = code(b"og");

/// One received application message.
pub type Message = Frame;

/// True for state-update-like codes that prefer the unreliable channel:
/// stale copies are worthless, so losing one beats delaying the next.
/// Everything else must arrive and stays on the reliable channel.
pub fn is_speed_sensitive(code: u16) -> bool {
    matches!(
        code,
        MSG_PLAYER_UPDATE
            | MSG_PLAYER_UPDATE_SMALL
            | MSG_SHOT_BEGIN
            | MSG_SHOT_END
            | MSG_GUIDED_UPDATE
            | MSG_UDP_LINK_REQUEST
            | MSG_UDP_LINK_ESTABLISHED
    )
}
