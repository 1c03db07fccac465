//! Byte-level wire codec shared by every proof structure.
//!
//! Fixed-width fields are raw bytes. Lengths and integers use an unsigned
//! LEB128-style varint: 7 data bits per byte, least significant group first,
//! high bit set while more bytes follow.

use crate::errors::DecodeError;

/// Append-only writer over an in-memory buffer.
#[derive(Debug, Default, Clone)]
pub struct Serializer {
    buf: Vec<u8>,
}

impl Serializer {
    /// Creates an empty serializer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes raw bytes with no length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes an unsigned varint.
    pub fn write_varuint(&mut self, mut value: u64) {
        loop {
            let low = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(low);
                return;
            }
            self.buf.push(low | 0x80);
        }
    }

    /// Writes a varint length followed by the bytes themselves.
    pub fn write_varbytes(&mut self, bytes: &[u8]) {
        self.write_varuint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrows the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the serializer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over a borrowed byte buffer.
///
/// Every read validates the remaining length first, so decoding arbitrary
/// input can fail but never panics or reads out of bounds.
#[derive(Debug, Clone)]
pub struct Deserializer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Deserializer<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: len - remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads an unsigned varint, rejecting values that overflow `u64` and
    /// encodings longer than necessary (a trailing zero group).
    pub fn read_varuint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let group = u64::from(byte & 0x7f);
            if shift >= 64 || (shift == 63 && group > 1) {
                return Err(DecodeError::malformed(start, "varuint overflows u64"));
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                if byte == 0 && shift > 0 {
                    return Err(DecodeError::malformed(
                        start,
                        "varuint is not minimally encoded",
                    ));
                }
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Reads a varint length prefix and that many bytes.
    ///
    /// The length must fall within `min..=max`; it is checked before any
    /// payload byte is touched.
    pub fn read_varbytes(&mut self, min: usize, max: usize) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let len = self.read_varuint()?;
        if len < min as u64 || len > max as u64 {
            return Err(DecodeError::malformed(
                start,
                format!("length {len} outside allowed range {min}..={max}"),
            ));
        }
        self.read_bytes(len as usize)
    }

    /// Checks that the next bytes equal `expected`.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<(), DecodeError> {
        let start = self.pos;
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(DecodeError::BadMagic { offset: start });
        }
        Ok(())
    }

    /// Fails if any input remains unread.
    pub fn expect_eof(&self) -> Result<(), DecodeError> {
        if !self.is_exhausted() {
            return Err(DecodeError::malformed(
                self.pos,
                format!("{} trailing byte(s)", self.remaining()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varuint(value: u64) -> Vec<u8> {
        let mut ser = Serializer::new();
        ser.write_varuint(value);
        ser.into_bytes()
    }

    #[test]
    fn varuint_known_encodings() {
        assert_eq!(varuint(0), vec![0x00]);
        assert_eq!(varuint(1), vec![0x01]);
        assert_eq!(varuint(0x7f), vec![0x7f]);
        assert_eq!(varuint(0x80), vec![0x80, 0x01]);
        assert_eq!(varuint(300), vec![0xac, 0x02]);
        assert_eq!(varuint(u64::MAX).len(), 10);
    }

    #[test]
    fn varuint_decodes_max_value() {
        let bytes = varuint(u64::MAX);
        let mut de = Deserializer::new(&bytes);
        assert_eq!(de.read_varuint().unwrap(), u64::MAX);
        assert!(de.is_exhausted());
    }

    #[test]
    fn varuint_rejects_overflow() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        let err = Deserializer::new(&bytes).read_varuint().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));
    }

    #[test]
    fn varuint_rejects_padding() {
        let err = Deserializer::new(&[0x80, 0x00]).read_varuint().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));
        let err = Deserializer::new(&[0x81, 0x80, 0x00]).read_varuint().unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));
        assert_eq!(Deserializer::new(&[0x00]).read_varuint().unwrap(), 0);
    }

    #[test]
    fn varuint_truncated_mid_value() {
        let err = Deserializer::new(&[0x80, 0x80]).read_varuint().unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 2, needed: 1 });
    }

    #[test]
    fn read_bytes_reports_shortfall() {
        let mut de = Deserializer::new(b"abc");
        assert_eq!(de.read_bytes(2).unwrap(), b"ab");
        assert_eq!(
            de.read_bytes(4).unwrap_err(),
            DecodeError::Truncated { offset: 2, needed: 3 }
        );
    }

    #[test]
    fn varbytes_checks_length_before_reading() {
        // Claims 0x7f bytes with only one present: the bound is hit first.
        let mut de = Deserializer::new(&[0x7f, 0x00]);
        let err = de.read_varbytes(1, 16).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { offset: 0, .. }));

        let mut de = Deserializer::new(&[0x00]);
        assert!(matches!(
            de.read_varbytes(1, 16).unwrap_err(),
            DecodeError::Malformed { .. }
        ));
    }

    #[test]
    fn varbytes_layout() {
        let mut ser = Serializer::new();
        ser.write_varbytes(b"foobar");
        assert_eq!(ser.as_bytes(), b"\x06foobar");

        let bytes = ser.into_bytes();
        let mut de = Deserializer::new(&bytes);
        assert_eq!(de.read_varbytes(0, 8).unwrap(), b"foobar");
        de.expect_eof().unwrap();
    }

    #[test]
    fn magic_mismatch_is_distinct() {
        let mut de = Deserializer::new(b"NOPE-and-more");
        assert_eq!(
            de.expect_magic(b"MAGIC").unwrap_err(),
            DecodeError::BadMagic { offset: 0 }
        );
        assert!(matches!(
            Deserializer::new(b"").expect_magic(b"MAGIC").unwrap_err(),
            DecodeError::Truncated { .. }
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut de = Deserializer::new(&[0x01, 0x02]);
        de.read_u8().unwrap();
        assert!(matches!(
            de.expect_eof().unwrap_err(),
            DecodeError::Malformed { offset: 1, .. }
        ));
    }
}
