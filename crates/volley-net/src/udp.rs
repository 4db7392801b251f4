//! The unreliable channel: connectionless, unordered, lossy datagrams.
//!
//! Bound to the reliable channel's exact local endpoint (same IP and port
//! number — the two port spaces are independent) so the remote host can
//! correlate the datagram flow with the TCP session by address. Receive is
//! polling only: the session must keep servicing the reliable channel, so
//! there is no blocking mode here.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Best-effort datagram channel to the game host.
pub struct UnreliableChannel {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UnreliableChannel {
    /// Open the local datagram endpoint on `local` (the reliable channel's
    /// own local address) aimed at `peer` (the host's reliable-channel
    /// address). Returns the bound local port.
    pub async fn open(local: SocketAddr, peer: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        Ok(Self { socket, peer })
    }

    /// Local port the channel is listening on.
    pub fn local_port(&self) -> io::Result<u16> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Send one datagram to the peer, waiting for socket writability first
    /// (a freshly bound socket has never been observed writable, so a
    /// non-blocking send would spuriously report `WouldBlock`). Best
    /// effort: the caller is expected to ignore failures, that is the
    /// channel's contract.
    pub async fn send_datagram(&self, buf: &[u8]) -> io::Result<usize> {
        self.socket.send_to(buf, self.peer).await
    }

    /// Wait until a datagram is pending. Readiness can be spurious; treat
    /// a following empty [`try_recv`](Self::try_recv) as normal.
    pub async fn readable(&self) -> io::Result<()> {
        self.socket.readable().await
    }

    /// Poll for one datagram. Returns `None` when nothing is pending.
    pub fn try_recv(&self, buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
        match self.socket.try_recv_from(buf) {
            Ok((n, from)) => Ok(Some((n, from))),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}
