//! Fixed-width big-endian encoding and decoding.
//!
//! Every multi-byte value on the wire is network byte order regardless of
//! host order. Encoding never fails. Decoding never fails either: a
//! [`WireReader`] is handed exactly the bytes a frame header declared, so a
//! short buffer is a logic error in the caller, not a data error, and it
//! faults loudly (slice bounds panic) rather than returning a soft error.

/// Cursor-based writer appending big-endian values to an owned buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append an unsigned 8-bit value.
    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Append an unsigned 16-bit value.
    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a signed 16-bit value.
    pub fn put_i16(&mut self, v: i16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append an unsigned 32-bit value.
    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a signed 32-bit value.
    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a 32-bit float (IEEE 754 bit pattern, big-endian).
    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Append a string into a fixed-width field, null-padded to `width`.
    /// Strings longer than `width` are truncated.
    pub fn put_fixed_str(&mut self, s: &str, width: usize) -> &mut Self {
        let bytes = s.as_bytes();
        let take = bytes.len().min(width);
        self.buf.extend_from_slice(&bytes[..take]);
        self.buf.resize(self.buf.len() + (width - take), 0);
        self
    }

    /// Append raw bytes verbatim.
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based reader over a byte slice.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &'a [u8] {
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    /// Read an unsigned 8-bit value.
    pub fn get_u8(&mut self) -> u8 {
        self.take(1)[0]
    }

    /// Read an unsigned 16-bit value.
    pub fn get_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take(2).try_into().unwrap())
    }

    /// Read a signed 16-bit value.
    pub fn get_i16(&mut self) -> i16 {
        i16::from_be_bytes(self.take(2).try_into().unwrap())
    }

    /// Read an unsigned 32-bit value.
    pub fn get_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    /// Read a signed 32-bit value.
    pub fn get_i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    /// Read a 32-bit float.
    pub fn get_f32(&mut self) -> f32 {
        f32::from_be_bytes(self.take(4).try_into().unwrap())
    }

    /// Read a fixed-width null-padded string field, returning the content
    /// up to the first null byte (lossy on invalid UTF-8).
    pub fn get_fixed_str(&mut self, width: usize) -> String {
        let field = self.take(width);
        let end = field.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8_lossy(&field[..end]).into_owned()
    }

    /// Read `n` raw bytes.
    pub fn get_bytes(&mut self, n: usize) -> &'a [u8] {
        self.take(n)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u16_roundtrip() {
        for v in [0u16, 1, 0x00FF, 0xFF00, u16::MAX] {
            let mut w = WireWriter::new();
            w.put_u16(v);
            let bytes = w.into_bytes();
            assert_eq!(WireReader::new(&bytes).get_u16(), v);
        }
    }

    #[test]
    fn test_i16_roundtrip() {
        for v in [i16::MIN, -1, 0, 1, i16::MAX] {
            let mut w = WireWriter::new();
            w.put_i16(v);
            let bytes = w.into_bytes();
            assert_eq!(WireReader::new(&bytes).get_i16(), v);
        }
    }

    #[test]
    fn test_u32_i32_roundtrip() {
        let mut w = WireWriter::new();
        w.put_u32(0xDEADBEEF).put_i32(i32::MIN);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.get_u32(), 0xDEADBEEF);
        assert_eq!(r.get_i32(), i32::MIN);
    }

    #[test]
    fn test_f32_roundtrip_is_exact() {
        for v in [0.0f32, -0.0, 1.5, -273.15, f32::MAX, f32::MIN_POSITIVE] {
            let mut w = WireWriter::new();
            w.put_f32(v);
            let bytes = w.into_bytes();
            let back = WireReader::new(&bytes).get_f32();
            assert_eq!(back.to_bits(), v.to_bits(), "bit-exact roundtrip for {v}");
        }
    }

    #[test]
    fn test_encoding_is_big_endian() {
        let mut w = WireWriter::new();
        w.put_u16(0x0102).put_u32(0x03040506);
        assert_eq!(w.into_bytes(), [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_fixed_str_null_padded() {
        let mut w = WireWriter::new();
        w.put_fixed_str("abc", 6);
        let bytes = w.into_bytes();
        assert_eq!(bytes, [b'a', b'b', b'c', 0, 0, 0]);
        assert_eq!(WireReader::new(&bytes).get_fixed_str(6), "abc");
    }

    #[test]
    fn test_fixed_str_exact_width_has_no_terminator() {
        let mut w = WireWriter::new();
        w.put_fixed_str("abcdef", 6);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 6);
        assert_eq!(WireReader::new(&bytes).get_fixed_str(6), "abcdef");
    }

    #[test]
    fn test_fixed_str_truncates_overlong_input() {
        let mut w = WireWriter::new();
        w.put_fixed_str("longer than field", 6);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 6);
        assert_eq!(WireReader::new(&bytes).get_fixed_str(6), "longer");
    }

    #[test]
    fn test_raw_bytes_and_remaining() {
        let mut w = WireWriter::new();
        w.put_bytes(&[9, 8, 7]).put_u8(1);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.remaining(), 4);
        assert_eq!(r.get_bytes(3), &[9, 8, 7]);
        assert_eq!(r.get_u8(), 1);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_mixed_sequence_roundtrip() {
        let mut w = WireWriter::new();
        w.put_u8(7)
            .put_u16(1000)
            .put_i16(-1000)
            .put_f32(3.25)
            .put_fixed_str("tank", 8)
            .put_i32(-42);
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.get_u8(), 7);
        assert_eq!(r.get_u16(), 1000);
        assert_eq!(r.get_i16(), -1000);
        assert_eq!(r.get_f32(), 3.25);
        assert_eq!(r.get_fixed_str(8), "tank");
        assert_eq!(r.get_i32(), -42);
    }

    #[test]
    #[should_panic]
    fn test_short_buffer_faults_loudly() {
        let bytes = [0u8; 2];
        WireReader::new(&bytes).get_u32();
    }
}
