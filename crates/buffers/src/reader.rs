//! Bounds-checked byte reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A reader over a borrowed byte slice.
///
/// Every `try_*` method checks the remaining length first and leaves the
/// cursor where it was when it fails.
///
/// # Example
///
/// ```
/// use marshal_buffers::Reader;
///
/// let data = [0x69, 0x01, 0x00, 0x00, 0x00];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8(), Ok(0x69));
/// assert_eq!(reader.try_i32le(), Ok(1));
/// assert_eq!(reader.size(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    /// The underlying byte slice.
    pub uint8: &'a [u8],
    /// Current cursor position.
    pub x: usize,
    /// End position (exclusive).
    pub end: usize,
}

impl<'a> Reader<'a> {
    pub fn new(uint8: &'a [u8]) -> Self {
        let end = uint8.len();
        Self { uint8, x: 0, end }
    }

    /// Creates a reader positioned at `x` over `uint8[..end]`.
    pub fn from_slice(uint8: &'a [u8], x: usize, end: usize) -> Self {
        Self { uint8, x, end }
    }

    /// Returns the number of remaining bytes.
    pub fn size(&self) -> usize {
        self.end.saturating_sub(self.x)
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        let available = self.size();
        if n > available {
            Err(BufferError::EndOfBuffer {
                needed: n,
                available,
            })
        } else {
            Ok(())
        }
    }

    /// Advances the cursor by `length` bytes.
    pub fn try_skip(&mut self, length: usize) -> Result<(), BufferError> {
        self.check(length)?;
        self.x += length;
        Ok(())
    }

    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Reads a signed 32-bit little-endian integer.
    #[inline]
    pub fn try_i32le(&mut self) -> Result<i32, BufferError> {
        self.array::<4>().map(i32::from_le_bytes)
    }

    /// Reads an unsigned 32-bit little-endian integer.
    #[inline]
    pub fn try_u32le(&mut self) -> Result<u32, BufferError> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    /// Reads a 64-bit float from its little-endian IEEE-754 bit pattern.
    #[inline]
    pub fn try_f64le(&mut self) -> Result<f64, BufferError> {
        self.array::<8>()
            .map(|b| f64::from_bits(u64::from_le_bytes(b)))
    }

    /// Reads `size` raw bytes and advances the cursor.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let x = self.x;
        let end = x + size;
        let bin = &self.uint8[x..end];
        self.x = end;
        Ok(bin)
    }

    /// Reads a UTF-8 string of `size` bytes.
    pub fn try_utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        self.check(size)?;
        let start = self.x;
        let s = str::from_utf8(&self.uint8[start..start + size])
            .map_err(|_| BufferError::InvalidUtf8)?;
        self.x += size;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_u8_end_of_buffer() {
        let data: [u8; 0] = [];
        let mut reader = Reader::new(&data);
        assert_eq!(
            reader.try_u8(),
            Err(BufferError::EndOfBuffer {
                needed: 1,
                available: 0
            })
        );
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_try_i32le_negative() {
        let mut writer = crate::Writer::new();
        writer.i32le(-123456);
        let data = writer.flush();
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_i32le(), Ok(-123456));
    }

    #[test]
    fn test_try_u32le_partial() {
        let data = [0x01u8, 0x02, 0x03];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.try_u32le(),
            Err(BufferError::EndOfBuffer { needed: 4, available: 3 })
        ));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_try_f64le_bit_exact() {
        let mut writer = crate::Writer::new();
        writer.f64le(-0.0);
        let data = writer.flush();
        let mut reader = Reader::new(&data);
        let got = reader.try_f64le().unwrap();
        assert_eq!(got.to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn test_try_buf_respects_end() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = Reader::from_slice(&data, 1, 3);
        assert_eq!(reader.size(), 2);
        assert_eq!(reader.try_buf(2), Ok([2u8, 3].as_ref()));
        assert!(reader.try_u8().is_err());
    }

    #[test]
    fn test_try_utf8_invalid_keeps_cursor() {
        let data = [0xffu8, 0xfe];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_utf8(2), Err(BufferError::InvalidUtf8));
        assert_eq!(reader.x, 0);
    }

    #[test]
    fn test_try_skip() {
        let data = [0x55u8, 0x66];
        let mut reader = Reader::new(&data);
        reader.try_skip(1).unwrap();
        assert_eq!(reader.x, 1);
        assert!(matches!(reader.try_skip(2), Err(BufferError::EndOfBuffer { .. })));
        assert_eq!(reader.x, 1);
        assert_eq!(reader.try_u8(), Ok(0x66));
    }
}
