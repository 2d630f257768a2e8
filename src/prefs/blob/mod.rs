//! Fixed-layout blob encoding for user-defined preference types.
//!
//! Implement [`Blob`] for a struct to persist it with a [`Pref`](crate::prefs::Pref).
//! The layout is written field by field through [`BlobWriter`], so it does not
//! depend on the in-memory representation of the struct.
//!
//! ```
//! use embedded_prefs::prefs::{Blob, BlobReader, BlobWriter};
//!
//! #[derive(Clone, PartialEq)]
//! struct Calibration {
//!     offset: i32,
//!     gain: f32,
//! }
//!
//! impl Blob for Calibration {
//!     const SIZE: usize = 8;
//!
//!     fn encode(&self, w: &mut BlobWriter<'_>) {
//!         w.write_i32(self.offset);
//!         w.write_f32(self.gain);
//!     }
//!
//!     fn decode(r: &mut BlobReader<'_>) -> Option<Self> {
//!         Some(Self { offset: r.read_i32(), gain: r.read_f32() })
//!     }
//! }
//! ```
//!
//! Changing the layout of a type makes previously persisted values of that
//! type unreadable: they are reported as a size mismatch or rejected by
//! `decode`.

mod macros;
mod reader;
mod writer;

pub use reader::BlobReader;
pub use writer::BlobWriter;

/// Upper bound on [`Blob::SIZE`]. Blobs are encoded on the stack.
pub const MAX_BLOB_SIZE: usize = 256;

/// A value persisted as an opaque, fixed-size byte blob.
pub trait Blob: Clone + PartialEq {
    /// Exact encoded size in bytes. Must not exceed [`MAX_BLOB_SIZE`].
    const SIZE: usize;

    /// Writes exactly `SIZE` bytes.
    fn encode(&self, w: &mut BlobWriter<'_>);

    /// Decodes a value from exactly `SIZE` bytes.
    ///
    /// Returns `None` if the bytes do not form a valid value.
    fn decode(r: &mut BlobReader<'_>) -> Option<Self>;
}
