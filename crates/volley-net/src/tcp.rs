//! The reliable channel: an ordered, connection-oriented byte stream.
//!
//! Wraps a tokio [`TcpStream`] behind the small surface the link layer
//! needs: a bounded connect, whole-buffer sends, and a receive whose
//! blocking behavior is chosen per call. "No data yet" is reported as
//! [`RecvStatus::WouldBlock`], distinct from real I/O errors, so the caller
//! can tell "try again later" from "tear the session down".

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::platform::{SocketConfig, configure_stream};

/// How long a receive may wait for data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Poll: return immediately if no data is ready.
    NoWait,
    /// Block up to the given duration.
    For(Duration),
    /// Block until data arrives or the connection fails.
    Forever,
}

/// Outcome of a receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// `n` bytes were read into the buffer.
    Received(usize),
    /// No data became ready within the wait budget.
    WouldBlock,
    /// The peer closed the stream cleanly.
    Closed,
}

/// Ordered, lossless byte-stream channel to the game host.
#[derive(Debug)]
pub struct ReliableChannel {
    stream: TcpStream,
}

impl ReliableChannel {
    /// Connect to `addr`, giving up after `timeout`.
    ///
    /// The timeout mechanism is internal to the channel; callers see only
    /// success or an [`io::ErrorKind::TimedOut`] error.
    pub async fn connect_with_timeout(addr: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        Ok(Self { stream })
    }

    /// Local endpoint of the stream. The unreliable channel binds to this
    /// exact address so the host can correlate the two channels.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    /// Remote endpoint of the stream.
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Queue the whole buffer on the outbound stream.
    pub async fn send_bytes(&mut self, buf: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(buf).await
    }

    /// Read whatever is available into `buf`, waiting per `wait`.
    pub async fn recv_bytes(&mut self, buf: &mut [u8], wait: Wait) -> io::Result<RecvStatus> {
        match wait {
            Wait::NoWait => self.try_read_once(buf),
            Wait::For(duration) => {
                let deadline = Instant::now() + duration;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(RecvStatus::WouldBlock);
                    }
                    // Readiness can be spurious; re-check after every wakeup.
                    if tokio::time::timeout(remaining, self.stream.ready(Interest::READABLE))
                        .await
                        .is_err()
                    {
                        return Ok(RecvStatus::WouldBlock);
                    }
                    match self.try_read_once(buf)? {
                        RecvStatus::WouldBlock => continue,
                        status => return Ok(status),
                    }
                }
            }
            Wait::Forever => loop {
                self.stream.ready(Interest::READABLE).await?;
                match self.try_read_once(buf)? {
                    RecvStatus::WouldBlock => continue,
                    status => return Ok(status),
                }
            },
        }
    }

    /// Wait until the stream reports readable. Readiness can be spurious;
    /// treat a following `WouldBlock` as normal.
    pub async fn readable(&self) -> io::Result<()> {
        self.stream.ready(Interest::READABLE).await.map(|_| ())
    }

    fn try_read_once(&mut self, buf: &mut [u8]) -> io::Result<RecvStatus> {
        match self.stream.try_read(buf) {
            Ok(0) => Ok(RecvStatus::Closed),
            Ok(n) => Ok(RecvStatus::Received(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvStatus::WouldBlock),
            Err(e) => Err(e),
        }
    }

    /// Switch the channel into low-latency mode (TCP_NODELAY, keepalive).
    /// Called once the handshake succeeds.
    pub fn set_low_latency(&self, config: &SocketConfig) -> io::Result<()> {
        configure_stream(&self.stream, config)
    }

    /// Shut down the outbound half of the stream, flushing queued bytes and
    /// sending FIN. Dropping the channel closes the socket either way; this
    /// just makes the goodbye orderly.
    pub async fn close(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await
    }
}
