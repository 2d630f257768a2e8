use super::macros::{impl_cursor_common, impl_write_all, impl_write_le};

/// Sequential writer for a fixed-layout blob.
///
/// All multi-byte values are written little-endian so the persisted layout
/// does not depend on the target.
#[derive(Debug)]
pub struct BlobWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BlobWriter<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Writes raw bytes and advances the cursor.
    ///
    /// # Panics
    /// Panics if fewer than `data.len()` bytes remain.
    pub fn put(&mut self, data: &[u8]) {
        assert!(
            data.len() <= self.remaining(),
            "blob write out of bounds: pos {} + len {} > size {}",
            self.pos,
            data.len(),
            self.buf.len()
        );
        self.buf[self.pos..self.pos + data.len()].copy_from_slice(data);
        self.pos += data.len();
    }

    /// Writes a boolean as one byte.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    /// Fills the remaining bytes with `value`.
    pub fn pad(&mut self, value: u8) {
        self.buf[self.pos..].fill(value);
        self.pos = self.buf.len();
    }

    impl_cursor_common!();
    impl_write_all!();
}
