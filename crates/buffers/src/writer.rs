//! Growable byte writer with little-endian primitives.

/// A byte buffer writer that grows automatically as needed.
///
/// # Example
///
/// ```
/// use marshal_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(b'i');
/// writer.i32le(-2);
/// let data = writer.flush();
/// assert_eq!(data, [b'i', 0xfe, 0xff, 0xff, 0xff]);
/// ```
pub struct Writer {
    /// The underlying byte buffer.
    pub uint8: Vec<u8>,
    /// Position where last flush happened.
    pub x0: usize,
    /// Current cursor position.
    pub x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with the default allocation size (4 KiB).
    pub fn new() -> Self {
        Self::with_alloc_size(4 * 1024)
    }

    /// Creates a new writer with custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let alloc_size = alloc_size.max(16);
        Self {
            uint8: vec![0u8; alloc_size],
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Ensures the buffer has at least `capacity` bytes available.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.uint8.len() - self.x;
        if remaining < capacity {
            let total = self.uint8.len() - self.x0;
            let required = capacity - remaining;
            let total_required = total + required;
            let new_size = if total_required <= self.alloc_size {
                self.alloc_size
            } else {
                total_required * 2
            };
            self.grow(new_size);
        }
    }

    fn grow(&mut self, new_size: usize) {
        let x0 = self.x0;
        let x = self.x;
        let mut new_buf = vec![0u8; new_size];
        new_buf[..x - x0].copy_from_slice(&self.uint8[x0..x]);
        self.uint8 = new_buf;
        self.x = x - x0;
        self.x0 = 0;
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x - self.x0
    }

    pub fn is_empty(&self) -> bool {
        self.x == self.x0
    }

    /// Returns the written data and advances the flush position.
    pub fn flush(&mut self) -> Vec<u8> {
        let result = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        result
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes a signed 32-bit integer (little-endian).
    #[inline]
    pub fn i32le(&mut self, val: i32) {
        self.ensure_capacity(4);
        self.uint8[self.x..self.x + 4].copy_from_slice(&val.to_le_bytes());
        self.x += 4;
    }

    /// Writes an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32le(&mut self, val: u32) {
        self.ensure_capacity(4);
        self.uint8[self.x..self.x + 4].copy_from_slice(&val.to_le_bytes());
        self.x += 4;
    }

    /// Writes a 64-bit float as its IEEE-754 bit pattern (little-endian).
    #[inline]
    pub fn f64le(&mut self, val: f64) {
        self.ensure_capacity(8);
        self.uint8[self.x..self.x + 8].copy_from_slice(&val.to_bits().to_le_bytes());
        self.x += 8;
    }

    /// Writes a u8 followed by a little-endian u32.
    pub fn u8u32le(&mut self, u8_val: u8, u32_val: u32) {
        self.ensure_capacity(5);
        self.uint8[self.x] = u8_val;
        self.uint8[self.x + 1..self.x + 5].copy_from_slice(&u32_val.to_le_bytes());
        self.x += 5;
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes a UTF-8 string. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.buf(s.as_bytes());
        s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_i32le_negative() {
        let mut writer = Writer::new();
        writer.i32le(-1000);
        let data = writer.flush();
        assert_eq!(data, (-1000i32).to_le_bytes());
    }

    #[test]
    fn test_u8u32le() {
        let mut writer = Writer::new();
        writer.u8u32le(b'[', 3);
        assert_eq!(writer.flush(), [b'[', 3, 0, 0, 0]);
    }

    #[test]
    fn test_f64le_preserves_bits() {
        let mut writer = Writer::new();
        let nan = f64::from_bits(0x7ff8_0000_0000_1234);
        writer.f64le(nan);
        let data = writer.flush();
        assert_eq!(data, 0x7ff8_0000_0000_1234u64.to_le_bytes());
    }

    #[test]
    fn test_grows_past_alloc_size() {
        let mut writer = Writer::with_alloc_size(16);
        let payload = vec![7u8; 100];
        writer.u8(1);
        writer.buf(&payload);
        let data = writer.flush();
        assert_eq!(data.len(), 101);
        assert_eq!(data[0], 1);
        assert!(data[1..].iter().all(|b| *b == 7));
    }

    #[test]
    fn test_flush_multiple() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.len(), 1);
        assert_eq!(writer.flush(), [0x02]);
        assert!(writer.is_empty());
    }
}
