use core::cell::RefCell;

use critical_section::Mutex;

use crate::prefs::{
    PrefsError, collection::Collection, engine::Engine, transaction::Transaction,
    types::CacheState, value::PrefValue,
};

struct Cached<T> {
    state: CacheState,
    // `None` stands for the default value.
    value: Option<T>,
}

/// A typed preference bound to one key of a [`Collection`].
///
/// Storage is consulted lazily: the first access reads the key and caches
/// the outcome, later reads are served from memory. Writes go straight to
/// storage and update the cache on success. After a failed operation the
/// cache is marked [`CacheState::Error`] and the next access reads storage
/// again.
///
/// A namespace that cannot be opened for reading is treated as empty, so a
/// device with broken storage still runs on defaults.
///
/// ```
/// use embedded_prefs::prefs::{Collection, I16, MemoryEngine, Pref};
///
/// let col = Collection::new("foo", MemoryEngine::<8, 32>::new());
/// let p1: I16<'_, _> = Pref::new(&col, "pref1", 0);
///
/// assert_eq!(p1.get(), 0);
/// p1.set(42).unwrap();
/// assert_eq!(p1.get(), 42);
/// assert!(p1.is_set());
/// p1.clear().unwrap();
/// assert_eq!(p1.get(), 0);
/// assert!(!p1.is_set());
/// ```
pub struct Pref<'c, T: PrefValue, E: Engine> {
    collection: &'c Collection<E>,
    key: &'static str,
    default: T,
    cache: Mutex<RefCell<Cached<T>>>,
}

impl<'c, T: PrefValue + core::fmt::Debug, E: Engine> core::fmt::Debug for Pref<'c, T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pref")
            .field("collection", &self.collection.name())
            .field("key", &self.key)
            .field("default", &self.default)
            .field("state", &self.state())
            .finish()
    }
}

impl<'c, T: PrefValue, E: Engine> Pref<'c, T, E> {
    pub const fn new(collection: &'c Collection<E>, key: &'static str, default: T) -> Self {
        Self {
            collection,
            key,
            default,
            cache: Mutex::new(RefCell::new(Cached {
                state: CacheState::Unknown,
                value: None,
            })),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn collection(&self) -> &'c Collection<E> {
        self.collection
    }

    /// Current cache state, without consulting storage.
    pub fn state(&self) -> CacheState {
        critical_section::with(|cs| self.cache.borrow_ref(cs).state)
    }

    /// Forgets the cached value; the next access reads storage again.
    pub fn invalidate(&self) {
        self.update(CacheState::Unknown, None);
    }

    /// Returns true if a value is persisted for this key.
    pub fn is_set(&self) -> bool {
        self.sync();
        self.state() == CacheState::Set
    }

    /// Returns the persisted value, or the default if none is.
    ///
    /// In the error state this is the last value known before the failure.
    pub fn get(&self) -> T {
        self.sync();
        critical_section::with(|cs| {
            self.cache
                .borrow_ref(cs)
                .value
                .clone()
                .unwrap_or_else(|| self.default.clone())
        })
    }

    /// Persists `value`.
    ///
    /// Nothing is written if `value` is already the persisted value.
    pub fn set(&self, value: T) -> Result<(), PrefsError> {
        self.sync();
        let unchanged = critical_section::with(|cs| {
            let cache = self.cache.borrow_ref(cs);
            cache.state == CacheState::Set && cache.value.as_ref() == Some(&value)
        });
        if unchanged {
            return Ok(());
        }

        let t = Transaction::new(self.collection);
        match t.with_store(|store| store.write(self.key, &value)) {
            Ok(Ok(())) => {
                self.update(CacheState::Set, Some(value));
                Ok(())
            }
            Ok(Err(e)) => {
                log::warn!("failed to write {}/{}: {}", self.collection.name(), self.key, e);
                self.fail();
                Err(e)
            }
            Err(_) => {
                self.fail();
                Err(PrefsError::Unavailable)
            }
        }
    }

    /// Removes the persisted value, reverting to the default.
    ///
    /// Performs no I/O if the key is already known to be unset.
    pub fn clear(&self) -> Result<(), PrefsError> {
        self.sync();
        if self.state() == CacheState::Unset {
            return Ok(());
        }

        let t = Transaction::new(self.collection);
        match t.with_store(|store| store.clear(self.key)) {
            Ok(Ok(())) => {
                self.update(CacheState::Unset, None);
                Ok(())
            }
            Ok(Err(e)) => {
                log::warn!("failed to clear {}/{}: {}", self.collection.name(), self.key, e);
                self.fail();
                Err(e)
            }
            Err(_) => {
                self.fail();
                Err(PrefsError::Unavailable)
            }
        }
    }

    fn sync(&self) {
        if !self.state().needs_sync() {
            return;
        }

        let t = Transaction::read_only(self.collection);
        match t.with_store(|store| store.read::<T>(self.key)) {
            Ok(Ok(value)) => self.update(CacheState::Set, Some(value)),
            Ok(Err(PrefsError::NotFound)) => self.update(CacheState::Unset, None),
            Ok(Err(e)) => {
                log::debug!("cannot load {}/{}: {}", self.collection.name(), self.key, e);
                self.fail();
            }
            // Unreadable storage behaves as empty storage.
            Err(_) => self.update(CacheState::Unset, None),
        }
    }

    fn update(&self, state: CacheState, value: Option<T>) {
        critical_section::with(|cs| {
            let mut cache = self.cache.borrow_ref_mut(cs);
            cache.state = state;
            cache.value = value;
        });
    }

    // Keeps the stale value around for `get`.
    fn fail(&self) {
        critical_section::with(|cs| self.cache.borrow_ref_mut(cs).state = CacheState::Error);
    }
}

pub type Bool<'c, E> = Pref<'c, bool, E>;
pub type U8<'c, E> = Pref<'c, u8, E>;
pub type I8<'c, E> = Pref<'c, i8, E>;
pub type U16<'c, E> = Pref<'c, u16, E>;
pub type I16<'c, E> = Pref<'c, i16, E>;
pub type U32<'c, E> = Pref<'c, u32, E>;
pub type I32<'c, E> = Pref<'c, i32, E>;
pub type U64<'c, E> = Pref<'c, u64, E>;
pub type I64<'c, E> = Pref<'c, i64, E>;
pub type Float<'c, E> = Pref<'c, f32, E>;
pub type Double<'c, E> = Pref<'c, f64, E>;
pub type Str<'c, const N: usize, E> = Pref<'c, heapless::String<N>, E>;
pub type Bytes<'c, const N: usize, E> = Pref<'c, heapless::Vec<u8, N>, E>;

#[cfg(feature = "alloc")]
pub type String<'c, E> = Pref<'c, alloc::string::String, E>;
#[cfg(feature = "alloc")]
pub type ByteVec<'c, E> = Pref<'c, alloc::vec::Vec<u8>, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{
        memory::EngineStats,
        test_support::{Point, TestEngine, hstr, test_collection},
    };

    fn assert_fresh<T: PrefValue + core::fmt::Debug>(col: &Collection<TestEngine>, default: T) {
        let p = Pref::new(col, "fresh", default.clone());
        assert!(!p.is_set());
        assert_eq!(p.get(), default);
        assert_eq!(p.state(), CacheState::Unset);
    }

    fn assert_round_trip<T: PrefValue + core::fmt::Debug>(
        col: &Collection<TestEngine>,
        key: &'static str,
        default: T,
        value: T,
    ) {
        let p = Pref::new(col, key, default);
        p.set(value.clone()).unwrap();
        assert_eq!(p.get(), value);

        // A second pref on the same key reads it back from storage.
        let other = Pref::new(col, key, p.default_value().clone());
        assert!(other.is_set());
        assert_eq!(other.get(), value);
    }

    #[test]
    fn scenario_from_the_docs() {
        let col = test_collection();
        let p1: I16<'_, _> = Pref::new(&col, "pref1", 0);
        assert_eq!(p1.get(), 0);
        p1.set(42).unwrap();
        assert_eq!(p1.get(), 42);
        assert!(p1.is_set());
        p1.clear().unwrap();
        assert_eq!(p1.get(), 0);
        assert!(!p1.is_set());
    }

    #[test]
    fn fresh_prefs_report_defaults() {
        let col = test_collection();
        assert_fresh(&col, false);
        assert_fresh(&col, 7u8);
        assert_fresh(&col, -7i8);
        assert_fresh(&col, 700u16);
        assert_fresh(&col, -700i16);
        assert_fresh(&col, 70_000u32);
        assert_fresh(&col, -70_000i32);
        assert_fresh(&col, u64::MAX);
        assert_fresh(&col, i64::MIN);
        assert_fresh(&col, 0.5f32);
        assert_fresh(&col, -0.25f64);
        assert_fresh::<heapless::String<8>>(&col, hstr("dflt"));
        assert_fresh(&col, heapless::Vec::<u8, 4>::new());
        assert_fresh(&col, Point { x: 1, y: 2.0 });
    }

    #[test]
    fn all_types_round_trip() {
        let col = test_collection();
        assert_round_trip(&col, "bool", false, true);
        assert_round_trip(&col, "u8", 0u8, 0xDF);
        assert_round_trip(&col, "i8", 0i8, -128);
        assert_round_trip(&col, "u16", 0u16, 65_535);
        assert_round_trip(&col, "i16", 0i16, -12_345);
        assert_round_trip(&col, "u32", 0u32, 0xDFB1_BEEF);
        assert_round_trip(&col, "i32", 0i32, i32::MIN);
        assert_round_trip(&col, "u64", 0u64, u64::MAX);
    }

    #[test]
    fn wide_signed_round_trip() {
        let col = test_collection();
        assert_round_trip(&col, "i64", 0i64, i64::MIN + 1);
        assert_round_trip(&col, "i64max", 1i64, i64::MAX);
    }

    #[test]
    fn blob_types_round_trip() {
        let col = test_collection();
        assert_round_trip(&col, "f32", 0.0f32, 1.375);
        assert_round_trip(&col, "f64", 0.0f64, 1234.5678);
        assert_round_trip::<heapless::String<16>>(&col, "str", hstr(""), hstr("hello"));
        let mut bytes = heapless::Vec::<u8, 8>::new();
        bytes.extend_from_slice(&[0, 1, 0xFF]).unwrap();
        assert_round_trip(&col, "bytes", heapless::Vec::new(), bytes);
        assert_round_trip(&col, "point", Point { x: 0, y: 0.0 }, Point { x: -9, y: 0.75 });
        assert_round_trip::<heapless::String<16>>(&col, "empty", hstr("x"), hstr(""));
    }

    #[test]
    fn floats_are_bit_exact() {
        let col = test_collection();
        let p: Double<'_, _> = Pref::new(&col, "d", 0.0);
        p.set(-0.0).unwrap();
        let other: Double<'_, _> = Pref::new(&col, "d", 1.0);
        assert_eq!(other.get().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn repeated_set_writes_once() {
        let col = test_collection();
        let p: U32<'_, _> = Pref::new(&col, "n", 0);
        p.set(5).unwrap();
        p.set(5).unwrap();
        assert_eq!(col.with_engine(|e| e.stats().writes), 1);

        p.set(6).unwrap();
        assert_eq!(col.with_engine(|e| e.stats().writes), 2);
    }

    #[test]
    fn clear_of_unset_pref_touches_nothing() {
        let col = test_collection();
        let p: U8<'_, _> = Pref::new(&col, "n", 3);
        assert!(!p.is_set());
        col.with_engine(|e| e.reset_stats());

        p.clear().unwrap();
        assert_eq!(col.with_engine(|e| e.stats()), EngineStats::default());
    }

    #[test]
    fn reads_are_cached() {
        let col = test_collection();
        let p: I32<'_, _> = Pref::new(&col, "n", 0);
        p.get();
        p.get();
        p.is_set();
        assert_eq!(col.with_engine(|e| e.stats().begins), 1);

        p.invalidate();
        assert_eq!(p.state(), CacheState::Unknown);
        p.get();
        assert_eq!(col.with_engine(|e| e.stats().begins), 2);
    }

    #[test]
    fn grouped_accesses_share_one_open() {
        let col = test_collection();
        let a: U8<'_, _> = Pref::new(&col, "a", 0);
        let b: Bool<'_, _> = Pref::new(&col, "b", false);
        {
            let _t = Transaction::new(&col);
            a.set(1).unwrap();
            b.set(true).unwrap();
            a.clear().unwrap();
        }
        let stats = col.with_engine(|e| e.stats());
        assert_eq!((stats.begins, stats.ends), (1, 1));
    }

    #[test]
    fn wrong_type_is_an_error_state() {
        let col = test_collection();
        {
            let t = Transaction::new(&col);
            t.with_store(|store| store.write("k", &999i32)).unwrap().unwrap();
        }

        let p: U32<'_, _> = Pref::new(&col, "k", 11);
        assert_eq!(p.get(), 11);
        assert_eq!(p.state(), CacheState::Error);
        assert!(!p.is_set());

        // Writing the right type repairs it.
        p.set(12).unwrap();
        assert_eq!(p.state(), CacheState::Set);
        let fresh: U32<'_, _> = Pref::new(&col, "k", 0);
        assert_eq!(fresh.get(), 12);
    }

    #[test]
    fn write_failure_keeps_stale_value() {
        let col = test_collection();
        let p: U16<'_, _> = Pref::new(&col, "k", 0);
        p.set(1).unwrap();

        col.with_engine(|e| e.set_fail_writes(true));
        assert_eq!(p.set(2), Err(PrefsError::Storage));
        assert_eq!(p.state(), CacheState::Error);

        col.with_engine(|e| e.set_fail_writes(false));
        assert_eq!(p.get(), 1);
        assert_eq!(p.state(), CacheState::Set);
    }

    #[test]
    fn unopenable_namespace_falls_back_to_default() {
        let col = test_collection();
        col.with_engine(|e| e.set_fail_begin(true));
        let p: I64<'_, _> = Pref::new(&col, "k", -1);

        assert_eq!(p.get(), -1);
        assert_eq!(p.state(), CacheState::Unset);
        assert_eq!(p.set(5), Err(PrefsError::Unavailable));
        assert_eq!(p.state(), CacheState::Error);
        assert_eq!(p.get(), -1);
    }

    #[test]
    fn set_inside_read_only_scope_is_unavailable() {
        let col = test_collection();
        let p: U8<'_, _> = Pref::new(&col, "k", 0);
        let _ro = Transaction::read_only(&col);
        assert_eq!(p.set(1), Err(PrefsError::Unavailable));
        assert_eq!(p.state(), CacheState::Error);
    }

    #[test]
    fn clear_failure_is_reported() {
        let col = test_collection();
        let p: U8<'_, _> = Pref::new(&col, "k", 0);
        p.set(4).unwrap();
        col.with_engine(|e| e.set_fail_writes(true));
        assert_eq!(p.clear(), Err(PrefsError::Storage));
        assert_eq!(p.state(), CacheState::Error);
    }

    #[test]
    fn clear_without_open_namespace_is_unavailable() {
        let col = test_collection();
        let p: U8<'_, _> = Pref::new(&col, "k", 0);
        p.set(4).unwrap();

        col.with_engine(|e| e.set_fail_begin(true));
        assert_eq!(p.clear(), Err(PrefsError::Unavailable));
        assert_eq!(p.state(), CacheState::Error);

        // The stored value survives and is found on the next sync.
        col.with_engine(|e| e.set_fail_begin(false));
        assert_eq!(p.get(), 4);
        assert_eq!(p.state(), CacheState::Set);
    }

    #[test]
    fn clear_inside_read_only_scope_is_unavailable() {
        let col = test_collection();
        let p: U8<'_, _> = Pref::new(&col, "k", 0);
        p.set(4).unwrap();

        let ro = Transaction::read_only(&col);
        assert_eq!(p.clear(), Err(PrefsError::Unavailable));
        assert_eq!(p.state(), CacheState::Error);
        drop(ro);
        assert!(p.is_set());
    }

    #[test]
    fn prefs_can_be_shared() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<Collection<TestEngine>>();
        assert_sync::<Pref<'static, u8, TestEngine>>();
        assert_sync::<Pref<'static, Point, TestEngine>>();
    }
}
