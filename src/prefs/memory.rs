use bitmaps::{Bitmap, Bits, BitsImpl};
use heapless::{String, Vec};

use crate::prefs::{
    engine::Engine,
    types::{EntryType, Scalar},
};

/// Longest key (and namespace name) the engine accepts, as in NVS.
pub const MAX_KEY_LEN: usize = 15;

type Key = String<MAX_KEY_LEN>;

#[derive(Clone)]
enum Stored<const B: usize> {
    Scalar(Scalar),
    Blob(Vec<u8, B>),
}

struct Entry<const B: usize> {
    key: Key,
    value: Stored<B>,
}

impl<const B: usize> Entry<B> {
    fn empty() -> Self {
        Self {
            key: Key::new(),
            value: Stored::Scalar(Scalar::U8(0)),
        }
    }
}

/// Call counters kept by [`MemoryEngine`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub begins: usize,
    pub ends: usize,
    /// Successful `put`/`put_bytes` calls.
    pub writes: usize,
    /// Successful `remove` calls.
    pub removes: usize,
    /// `get`/`get_bytes` calls, successful or not.
    pub reads: usize,
}

/// Fixed-capacity, in-memory implementation of [`Engine`].
///
/// Mirrors the observable behavior of a flash namespace store: typed
/// entries, blob entries, type tags, a 15 character key limit and
/// read-only handles. Useful for host-side simulation and tests.
///
/// # Const Generics
/// - `SLOTS`: Maximum number of entries
/// - `BLOB`: Maximum blob size in bytes
pub struct MemoryEngine<const SLOTS: usize, const BLOB: usize>
where
    BitsImpl<SLOTS>: Bits,
{
    entries: [Entry<BLOB>; SLOTS],
    occupied: Bitmap<SLOTS>,
    namespace: Option<Key>,
    read_only: bool,
    fail_begin: bool,
    fail_writes: bool,
    stats: EngineStats,
}

impl<const SLOTS: usize, const BLOB: usize> core::fmt::Debug for MemoryEngine<SLOTS, BLOB>
where
    BitsImpl<SLOTS>: Bits,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("namespace", &self.namespace)
            .field("entries", &self.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<const SLOTS: usize, const BLOB: usize> Default for MemoryEngine<SLOTS, BLOB>
where
    BitsImpl<SLOTS>: Bits,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize, const BLOB: usize> MemoryEngine<SLOTS, BLOB>
where
    BitsImpl<SLOTS>: Bits,
{
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| Entry::empty()),
            occupied: Bitmap::new(),
            namespace: None,
            read_only: false,
            fail_begin: false,
            fail_writes: false,
            stats: EngineStats::default(),
        }
    }

    /// Returns the call counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EngineStats::default();
    }

    /// Makes every subsequent `begin` fail.
    pub fn set_fail_begin(&mut self, fail: bool) {
        self.fail_begin = fail;
    }

    /// Makes every subsequent write and remove fail.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Returns true while a namespace is open.
    pub fn is_open(&self) -> bool {
        self.namespace.is_some()
    }

    /// Name of the currently open namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    fn writable(&self) -> bool {
        self.is_open() && !self.read_only && !self.fail_writes
    }

    fn find(&self, key: &str) -> Option<usize> {
        if !self.is_open() {
            return None;
        }
        let mut idx = self.occupied.first_index();
        while let Some(slot) = idx {
            if self.entries[slot].key.as_str() == key {
                return Some(slot);
            }
            idx = self.occupied.next_index(slot);
        }
        None
    }

    fn store(&mut self, key: &str, value: Stored<BLOB>) -> bool {
        if !self.writable() || key.is_empty() || key.len() > MAX_KEY_LEN {
            return false;
        }
        let slot = match self.find(key) {
            Some(slot) => slot,
            None => match (0..SLOTS).find(|&i| !self.occupied.get(i)) {
                Some(slot) => slot,
                None => return false,
            },
        };
        let entry = &mut self.entries[slot];
        entry.key.clear();
        if entry.key.push_str(key).is_err() {
            return false;
        }
        entry.value = value;
        self.occupied.set(slot, true);
        self.stats.writes += 1;
        true
    }

    fn blob(&self, key: &str) -> Option<&Vec<u8, BLOB>> {
        match self.find(key).map(|slot| &self.entries[slot].value) {
            Some(Stored::Blob(data)) => Some(data),
            _ => None,
        }
    }
}

impl<const SLOTS: usize, const BLOB: usize> Engine for MemoryEngine<SLOTS, BLOB>
where
    BitsImpl<SLOTS>: Bits,
{
    fn begin(&mut self, namespace: &str, read_only: bool) -> bool {
        if self.fail_begin || self.is_open() || namespace.is_empty() {
            return false;
        }
        let mut name = Key::new();
        if name.push_str(namespace).is_err() {
            return false;
        }
        self.namespace = Some(name);
        self.read_only = read_only;
        self.stats.begins += 1;
        true
    }

    fn end(&mut self) {
        if self.namespace.take().is_some() {
            self.stats.ends += 1;
        }
    }

    fn is_key(&mut self, key: &str) -> bool {
        self.find(key).is_some()
    }

    fn remove(&mut self, key: &str) -> bool {
        if !self.writable() {
            return false;
        }
        match self.find(key) {
            Some(slot) => {
                self.occupied.set(slot, false);
                self.entries[slot] = Entry::empty();
                self.stats.removes += 1;
                true
            }
            None => false,
        }
    }

    fn entry_type(&mut self, key: &str) -> Option<EntryType> {
        self.find(key).map(|slot| match &self.entries[slot].value {
            Stored::Scalar(s) => s.entry_type(),
            Stored::Blob(_) => EntryType::Blob,
        })
    }

    fn put(&mut self, key: &str, value: Scalar) -> usize {
        if self.store(key, Stored::Scalar(value)) {
            value.size()
        } else {
            0
        }
    }

    fn get(&mut self, key: &str, default: Scalar) -> Scalar {
        self.stats.reads += 1;
        match self.find(key).map(|slot| &self.entries[slot].value) {
            Some(Stored::Scalar(s)) if s.entry_type() == default.entry_type() => *s,
            _ => default,
        }
    }

    fn put_bytes(&mut self, key: &str, data: &[u8]) -> usize {
        let Ok(blob) = Vec::from_slice(data) else {
            return 0;
        };
        if self.store(key, Stored::Blob(blob)) {
            data.len()
        } else {
            0
        }
    }

    fn bytes_length(&mut self, key: &str) -> usize {
        self.blob(key).map_or(0, |data| data.len())
    }

    fn get_bytes(&mut self, key: &str, out: &mut [u8]) -> usize {
        self.stats.reads += 1;
        match self.blob(key) {
            Some(data) if data.len() <= out.len() => {
                out[..data.len()].copy_from_slice(data);
                data.len()
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::test_support::TestEngine;

    fn open_engine() -> TestEngine {
        let mut engine = TestEngine::new();
        assert!(engine.begin("test", false));
        engine
    }

    #[test]
    fn closed_engine_rejects_everything() {
        let mut engine = TestEngine::new();
        assert_eq!(engine.put("a", Scalar::U8(1)), 0);
        assert_eq!(engine.entry_type("a"), None);
        assert_eq!(engine.get("a", Scalar::U8(7)), Scalar::U8(7));
        assert!(!engine.remove("a"));
    }

    #[test]
    fn data_survives_end_and_begin() {
        let mut engine = open_engine();
        assert_eq!(engine.put("a", Scalar::I32(-5)), 4);
        engine.end();
        assert!(!engine.is_open());

        assert!(engine.begin("test", true));
        assert_eq!(engine.entry_type("a"), Some(EntryType::I32));
        assert_eq!(engine.get("a", Scalar::I32(0)), Scalar::I32(-5));
        assert_eq!(engine.stats().begins, 2);
        assert_eq!(engine.stats().ends, 1);
    }

    #[test]
    fn read_only_handle_refuses_writes() {
        let mut engine = TestEngine::new();
        assert!(engine.begin("test", true));
        assert_eq!(engine.put("a", Scalar::U8(1)), 0);
        assert_eq!(engine.put_bytes("b", &[1, 2]), 0);
        assert!(!engine.is_key("a"));
    }

    #[test]
    fn double_begin_fails() {
        let mut engine = open_engine();
        assert!(!engine.begin("test", false));
    }

    #[test]
    fn typed_get_returns_default_on_tag_mismatch() {
        let mut engine = open_engine();
        engine.put("a", Scalar::U16(300));
        assert_eq!(engine.get("a", Scalar::I16(9)), Scalar::I16(9));
    }

    #[test]
    fn long_keys_are_rejected() {
        let mut engine = open_engine();
        assert_eq!(engine.put("a_very_long_key_name", Scalar::U8(1)), 0);
        assert_eq!(engine.put("fifteen_chars__", Scalar::U8(1)), 1);
    }

    #[test]
    fn blobs_and_empty_blobs() {
        let mut engine = open_engine();
        assert_eq!(engine.put_bytes("b", &[1, 2, 3]), 3);
        assert_eq!(engine.bytes_length("b"), 3);

        let mut small = [0u8; 2];
        assert_eq!(engine.get_bytes("b", &mut small), 0);
        let mut buf = [0u8; 4];
        assert_eq!(engine.get_bytes("b", &mut buf), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);

        assert_eq!(engine.put_bytes("e", &[]), 0);
        assert_eq!(engine.entry_type("e"), Some(EntryType::Blob));
        assert_eq!(engine.bytes_length("e"), 0);
    }

    #[test]
    fn capacity_exhaustion_and_slot_reuse() {
        let mut engine = open_engine();
        for (i, key) in ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7"]
            .iter()
            .enumerate()
        {
            assert_eq!(engine.put(key, Scalar::U8(i as u8)), 1);
        }
        assert_eq!(engine.len(), 8);
        assert_eq!(engine.put("k8", Scalar::U8(8)), 0);

        // Overwriting an existing key needs no new slot.
        assert_eq!(engine.put("k3", Scalar::U8(33)), 1);

        assert!(engine.remove("k0"));
        assert_eq!(engine.put("k8", Scalar::U8(8)), 1);
        assert_eq!(engine.get("k8", Scalar::U8(0)), Scalar::U8(8));
        assert_eq!(engine.get("k3", Scalar::U8(0)), Scalar::U8(33));
    }

    #[test]
    fn failure_injection() {
        let mut engine = TestEngine::new();
        engine.set_fail_begin(true);
        assert!(!engine.begin("test", false));
        engine.set_fail_begin(false);
        assert!(engine.begin("test", false));

        engine.put("a", Scalar::U8(1));
        engine.set_fail_writes(true);
        assert_eq!(engine.put("a", Scalar::U8(2)), 0);
        assert!(!engine.remove("a"));
        assert_eq!(engine.get("a", Scalar::U8(0)), Scalar::U8(1));
    }
}
