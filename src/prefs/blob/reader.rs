use super::macros::{impl_cursor_common, impl_read_all, impl_read_le};

/// Sequential reader over a persisted blob.
///
/// Decodes fixed-layout values written by [`BlobWriter`](super::BlobWriter).
/// All multi-byte values are little-endian.
#[derive(Debug)]
pub struct BlobReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Reads `len` raw bytes and advances the cursor.
    ///
    /// # Panics
    /// Panics if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> &'a [u8] {
        assert!(
            len <= self.remaining(),
            "blob read out of bounds: pos {} + len {} > size {}",
            self.pos,
            len,
            self.buf.len()
        );
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        out
    }

    /// Reads a boolean stored as one byte.
    #[inline]
    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    impl_cursor_common!();
    impl_read_all!();
}
