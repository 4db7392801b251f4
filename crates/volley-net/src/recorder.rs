//! Packet recording: a debug tee of reliable-channel traffic.
//!
//! The link invokes an optional observer callback with every reliable frame
//! it sends or receives; nothing in the protocol core depends on it. The
//! file recorder here is one such observer, writing timestamped records for
//! offline replay of a session.
//!
//! Record layout (big-endian): `[u8 direction][u32 tenth-milliseconds since
//! session start][u16 byte count][raw frame bytes]`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use volley_wire::WireWriter;

/// Which way a frame travelled on the reliable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Frame received from the host.
    Inbound,
    /// Frame sent to the host.
    Outbound,
}

/// Callback invoked with every reliable-channel frame: direction, time
/// since session start, and the raw wire bytes (header included).
pub type FrameObserver = Box<dyn FnMut(Direction, Duration, &[u8]) + Send>;

/// Encode one record for the on-disk tee format.
fn encode_record(direction: Direction, elapsed: Duration, frame: &[u8]) -> Vec<u8> {
    let tenth_millis = (elapsed.as_micros() / 100).min(u32::MAX as u128) as u32;
    let mut w = WireWriter::with_capacity(7 + frame.len());
    w.put_u8(match direction {
        Direction::Inbound => 1,
        Direction::Outbound => 0,
    })
    .put_u32(tenth_millis)
    .put_u16(frame.len() as u16)
    .put_bytes(frame);
    w.into_bytes()
}

/// Build an observer that tees every frame to `path`. Write failures are
/// logged and otherwise ignored; recording must never disturb the session.
pub fn file_recorder(path: &Path) -> std::io::Result<FrameObserver> {
    let mut writer = BufWriter::new(File::create(path)?);
    Ok(Box::new(move |direction, elapsed, frame| {
        let record = encode_record(direction, elapsed, frame);
        if let Err(e) = writer.write_all(&record).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "packet recorder write failed");
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use volley_wire::WireReader;

    #[test]
    fn test_record_layout() {
        let record = encode_record(Direction::Inbound, Duration::from_millis(150), &[9, 9, 9]);
        let mut r = WireReader::new(&record);
        assert_eq!(r.get_u8(), 1);
        assert_eq!(r.get_u32(), 1500); // tenth-milliseconds
        assert_eq!(r.get_u16(), 3);
        assert_eq!(r.get_bytes(3), &[9, 9, 9]);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_outbound_direction_tag_is_zero() {
        let record = encode_record(Direction::Outbound, Duration::ZERO, &[]);
        assert_eq!(record[0], 0);
    }

    #[test]
    fn test_file_recorder_writes_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.pkt");

        {
            let mut observer = file_recorder(&path).unwrap();
            observer(Direction::Outbound, Duration::from_millis(1), b"abcd");
            observer(Direction::Inbound, Duration::from_millis(2), b"efgh");
        }

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents.len(), 2 * (7 + 4));

        let mut r = WireReader::new(&contents);
        assert_eq!(r.get_u8(), 0);
        r.get_u32();
        assert_eq!(r.get_u16(), 4);
        assert_eq!(r.get_bytes(4), b"abcd");
        assert_eq!(r.get_u8(), 1);
    }
}
