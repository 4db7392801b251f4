//! Per-session traffic counters, kept cheap enough to update on every frame
//! and logged once at link teardown.

use std::time::{Duration, Instant};

/// Running counters for one session, split by channel.
pub struct LinkStats {
    started: Instant,
    reliable_bytes_sent: u64,
    reliable_frames_sent: u64,
    reliable_bytes_received: u64,
    reliable_frames_received: u64,
    datagram_bytes_sent: u64,
    datagrams_sent: u64,
    datagram_bytes_received: u64,
    datagrams_received: u64,
}

impl Default for LinkStats {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStats {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            reliable_bytes_sent: 0,
            reliable_frames_sent: 0,
            reliable_bytes_received: 0,
            reliable_frames_received: 0,
            datagram_bytes_sent: 0,
            datagrams_sent: 0,
            datagram_bytes_received: 0,
            datagrams_received: 0,
        }
    }

    pub(crate) fn record_reliable_sent(&mut self, bytes: usize) {
        self.reliable_bytes_sent += bytes as u64;
        self.reliable_frames_sent += 1;
    }

    pub(crate) fn record_reliable_received(&mut self, bytes: usize) {
        self.reliable_bytes_received += bytes as u64;
        self.reliable_frames_received += 1;
    }

    pub(crate) fn record_datagram_sent(&mut self, bytes: usize) {
        self.datagram_bytes_sent += bytes as u64;
        self.datagrams_sent += 1;
    }

    pub(crate) fn record_datagram_received(&mut self, bytes: usize) {
        self.datagram_bytes_received += bytes as u64;
        self.datagrams_received += 1;
    }

    /// Produce an immutable snapshot of the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            elapsed: self.started.elapsed(),
            reliable_bytes_sent: self.reliable_bytes_sent,
            reliable_frames_sent: self.reliable_frames_sent,
            reliable_bytes_received: self.reliable_bytes_received,
            reliable_frames_received: self.reliable_frames_received,
            datagram_bytes_sent: self.datagram_bytes_sent,
            datagrams_sent: self.datagrams_sent,
            datagram_bytes_received: self.datagram_bytes_received,
            datagrams_received: self.datagrams_received,
        }
    }
}

/// Immutable view of session traffic, suitable for a debug overlay or a
/// teardown log line.
#[derive(Debug, Clone, Default)]
pub struct StatsSnapshot {
    /// Time since the link went active.
    pub elapsed: Duration,
    /// Bytes sent over the reliable channel (headers included).
    pub reliable_bytes_sent: u64,
    /// Frames sent over the reliable channel.
    pub reliable_frames_sent: u64,
    /// Bytes received over the reliable channel.
    pub reliable_bytes_received: u64,
    /// Frames received over the reliable channel.
    pub reliable_frames_received: u64,
    /// Bytes sent as datagrams.
    pub datagram_bytes_sent: u64,
    /// Datagrams sent.
    pub datagrams_sent: u64,
    /// Bytes received as datagrams.
    pub datagram_bytes_received: u64,
    /// Datagrams received.
    pub datagrams_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate_per_channel() {
        let mut stats = LinkStats::new();
        stats.record_reliable_sent(10);
        stats.record_reliable_sent(20);
        stats.record_datagram_received(8);

        let snap = stats.snapshot();
        assert_eq!(snap.reliable_bytes_sent, 30);
        assert_eq!(snap.reliable_frames_sent, 2);
        assert_eq!(snap.datagram_bytes_received, 8);
        assert_eq!(snap.datagrams_received, 1);
        assert_eq!(snap.reliable_bytes_received, 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut stats = LinkStats::new();
        stats.record_datagram_sent(5);
        let snap = stats.snapshot();
        stats.record_datagram_sent(5);
        assert_eq!(snap.datagrams_sent, 1);
        assert_eq!(stats.snapshot().datagrams_sent, 2);
    }
}
