//! Bounds-checked byte cursor for parsing container data.
//!
//! [`ByteCursor`] is a forward-only reader over an immutable byte slice. All
//! reads are bounds-checked and fail with [`Error::OutOfBounds`] instead of
//! panicking, because truncated and structurally surprising inputs are the
//! normal case for this format, not the exception.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::compact;
use crate::{Error, Result};

/// A forward-only, bounds-checked reader over a byte slice.
///
/// # Example
///
/// ```
/// use veles_common::ByteCursor;
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut cursor = ByteCursor::new(&data);
///
/// assert_eq!(cursor.read_u16().unwrap(), 0x0201);
/// assert_eq!(cursor.read_u16_be().unwrap(), 0x0304);
/// assert!(cursor.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Create a new cursor from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a new cursor starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Get the remaining bytes as a slice.
    #[inline]
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.position.min(self.data.len())..]
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::OutOfBounds {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    /// Read a little-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_bytes(2).map(LittleEndian::read_u16)
    }

    /// Read a big-endian u16.
    #[inline]
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.read_bytes(2).map(BigEndian::read_u16)
    }

    /// Read a little-endian i16.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_bytes(2).map(LittleEndian::read_i16)
    }

    /// Read a little-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_bytes(4).map(LittleEndian::read_u32)
    }

    /// Read a big-endian u32.
    #[inline]
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.read_bytes(4).map(BigEndian::read_u32)
    }

    /// Read a little-endian i32.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_bytes(4).map(LittleEndian::read_i32)
    }

    /// Read a little-endian f32.
    #[inline]
    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_bytes(4).map(LittleEndian::read_f32)
    }

    /// Read a big-endian f32.
    #[inline]
    pub fn read_f32_be(&mut self) -> Result<f32> {
        self.read_bytes(4).map(BigEndian::read_f32)
    }

    /// Peek at a little-endian u32 without advancing.
    #[inline]
    pub fn peek_u32(&self) -> Result<u32> {
        self.peek_bytes(4).map(LittleEndian::read_u32)
    }

    /// Peek at a little-endian i32 without advancing.
    #[inline]
    pub fn peek_i32(&self) -> Result<i32> {
        self.peek_bytes(4).map(LittleEndian::read_i32)
    }

    /// Read a compact index.
    ///
    /// This is the container format's variable-length signed integer: 1 to 5
    /// bytes, with the high bit of each byte signalling continuation and the
    /// second-highest bit of the first byte carrying the sign. See
    /// [`compact`] for the exact bit layout.
    pub fn read_compact_index(&mut self) -> Result<i64> {
        let (value, len) = compact::decode(self.remaining_bytes())?;
        self.position += len;
        Ok(value)
    }

    /// Read a length-prefixed string.
    ///
    /// The length is a compact index counting characters including the NUL
    /// terminator. A positive length means single-byte ANSI characters; a
    /// negative length means UTF-16LE wide characters. Trailing NULs are
    /// stripped from the result.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_compact_index()?;

        if length == 0 {
            return Ok(String::new());
        }

        if length > 0 {
            let count = usize::try_from(length).map_err(|_| Error::InvalidStringLength(length))?;
            let bytes = self.read_bytes(count)?;
            // ANSI bytes map 1:1 onto the first 256 code points.
            let mut s: String = bytes.iter().map(|&b| b as char).collect();
            while s.ends_with('\0') {
                s.pop();
            }
            Ok(s)
        } else {
            let count = usize::try_from(-length).map_err(|_| Error::InvalidStringLength(length))?;
            let bytes = self.read_bytes(count * 2)?;
            let units: Vec<u16> = bytes.chunks_exact(2).map(LittleEndian::read_u16).collect();
            let mut s = String::from_utf16_lossy(&units);
            while s.ends_with('\0') {
                s.pop();
            }
            Ok(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u32().unwrap(), 0x04030201);
        assert_eq!(cursor.read_u32().unwrap(), 0xFFFFFFFF);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_byte_order_selectable_per_call() {
        let data = [0x12u8, 0x34, 0x12, 0x34];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u16().unwrap(), 0x3412);
        assert_eq!(cursor.read_u16_be().unwrap(), 0x1234);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.peek_u32().unwrap(), 0x04030201);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.read_u32().unwrap(), 0x04030201);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_eof_is_an_error_not_a_panic() {
        let data = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&data);

        assert!(matches!(
            cursor.read_u32(),
            Err(Error::OutOfBounds {
                needed: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn test_read_ansi_string() {
        // Length 6 covers "hello\0"; the NUL is stripped.
        let data = [6u8, b'h', b'e', b'l', b'l', b'o', 0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_string().unwrap(), "hello");
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_read_wide_string() {
        // Length -3 means 3 UTF-16 code units including the terminator.
        let mut data = vec![0x83u8]; // compact -3
        data.extend_from_slice(&[b'h', 0, b'i', 0, 0, 0]);
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_string().unwrap(), "hi");
    }

    #[test]
    fn test_empty_string() {
        let data = [0u8];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_string().unwrap(), "");
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_truncated_string_is_out_of_bounds() {
        let data = [10u8, b'a', b'b'];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.read_string(),
            Err(Error::OutOfBounds { .. })
        ));
    }
}
