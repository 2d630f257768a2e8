//! Test support utilities - only compiled in test builds.

use crate::prefs::{
    blob::{Blob, BlobReader, BlobWriter},
    collection::Collection,
    memory::MemoryEngine,
};

/// Standard test configuration: 8 entries, blobs up to 64 bytes
pub type TestEngine = MemoryEngine<8, 64>;

/// Helper to create an empty collection named "foo"
pub fn test_collection() -> Collection<TestEngine> {
    Collection::new("foo", TestEngine::new())
}

/// Builds a heapless string, panicking if it does not fit.
pub fn hstr<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    out.push_str(s).unwrap();
    out
}

/// A small fixed-layout struct persisted as a blob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: i32,
    pub y: f32,
}

impl Blob for Point {
    const SIZE: usize = 8;

    fn encode(&self, w: &mut BlobWriter<'_>) {
        w.write_i32(self.x);
        w.write_f32(self.y);
    }

    fn decode(r: &mut BlobReader<'_>) -> Option<Self> {
        Some(Self {
            x: r.read_i32(),
            y: r.read_f32(),
        })
    }
}
