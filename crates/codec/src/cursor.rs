//! Positioned big-endian reader over an in-memory buffer.
//!
//! Every fixed-width read advances the position by exactly its width or
//! fails with [`Error::TruncatedData`] without moving. Sub-range extraction
//! hands out slices of the underlying buffer, so nothing is copied until a
//! caller decides to keep the bytes.
//!
//! # String framing
//!
//! ```text
//! short:  [len: u8 < 255][bytes ...]
//! long:   [0xFF][len: u32][bytes ...]
//! ```
//!
//! The width of the length prefix depends on the data, so callers must read
//! strings through [`ByteCursor::read_tstring`] rather than assume a size.

use byteorder::{BigEndian, ByteOrder};
use rootio_core::{Error, Result};

/// Escape byte announcing a 4-byte string length
pub const LONG_STRING_MARKER: u8 = 255;

/// Positioned reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Create a cursor at `pos`, failing if `pos` lies past the end
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.set_position(pos)?;
        Ok(cursor)
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for an empty buffer
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The whole underlying buffer
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute position (the end of the buffer is allowed)
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::truncated(self.pos, pos - self.pos, self.remaining()));
        }
        self.pos = pos;
        Ok(())
    }

    /// Advance by `n` bytes
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    /// Step back by `n` bytes
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        if n > self.pos {
            return Err(Error::malformed(format!(
                "cannot rewind {} bytes from offset {}",
                n, self.pos
            )));
        }
        self.pos -= n;
        Ok(())
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::truncated(self.pos, n, self.remaining()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    #[inline]
    fn peek(&self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::truncated(self.pos, n, self.remaining()));
        }
        Ok(&self.data[self.pos..self.pos + n])
    }

    /// Zero-copy view of the next `len` bytes; advances past them
    pub fn extract_range(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Zero-copy view of `len` bytes at an absolute position; does not move
    pub fn slice_at(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        match pos.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[pos..end]),
            _ => Err(Error::truncated(
                pos,
                len,
                self.data.len().saturating_sub(pos),
            )),
        }
    }

    /// Read an unsigned byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a signed byte
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Read a byte as bool (non-zero is true)
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    /// Read a big-endian u16
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    /// Read a big-endian i16
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Read a big-endian u32
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Read a big-endian i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    /// Read a big-endian u64
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    /// Read a big-endian i64
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    /// Read a big-endian IEEE-754 single
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Read a big-endian IEEE-754 double
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    /// Read a u32 without advancing
    pub fn peek_u32(&self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.peek(4)?))
    }

    /// Read an i16 without advancing
    pub fn peek_i16(&self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.peek(2)?))
    }

    /// Read a length-prefixed string (1-byte length, or 0xFF then 4-byte length).
    ///
    /// A payload starting with NUL decodes as the empty string.
    pub fn read_tstring(&mut self) -> Result<String> {
        let mut len = self.read_u8()? as usize;
        if len == LONG_STRING_MARKER as usize {
            len = self.read_u32()? as usize;
        }
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.take(len)?;
        if bytes[0] == 0 {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a NUL-terminated string (the terminator is consumed)
    pub fn read_cstring(&mut self) -> Result<String> {
        let data = self.data;
        let rest = &data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                let bytes = self.take(end + 1)?;
                Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            None => Err(Error::truncated(self.pos, rest.len() + 1, rest.len())),
        }
    }

    /// Read exactly `n` bytes as text, stopping the text at the first NUL
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}
