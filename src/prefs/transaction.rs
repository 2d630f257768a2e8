use crate::prefs::{PrefsError, collection::Collection, engine::Engine, store::Store};

/// Scoped access to a [`Collection`].
///
/// Creating a transaction joins (or opens) the collection's namespace;
/// dropping it leaves, closing the namespace when it was the last holder.
/// Transactions nest freely, except that a read-write transaction cannot
/// start while the namespace is held open read-only. In that case, or if
/// the engine fails to open, the transaction is inactive.
///
/// Wrap several preference accesses in one transaction to read or write
/// them under a single open:
///
/// ```
/// use embedded_prefs::prefs::{Collection, MemoryEngine, Pref, Transaction};
///
/// let col = Collection::new("foo", MemoryEngine::<8, 32>::new());
/// let a = Pref::new(&col, "a", 0u16);
/// let b = Pref::new(&col, "b", false);
/// {
///     let _t = Transaction::new(&col);
///     a.set(3).unwrap();
///     b.set(true).unwrap();
/// }
/// assert_eq!(col.with_engine(|e| e.stats().begins), 1);
/// ```
pub struct Transaction<'c, E: Engine> {
    collection: &'c Collection<E>,
    active: bool,
}

impl<'c, E: Engine> core::fmt::Debug for Transaction<'c, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("collection", &self.collection.name())
            .field("active", &self.active)
            .finish()
    }
}

impl<'c, E: Engine> Transaction<'c, E> {
    /// Starts a read-write transaction.
    pub fn new(collection: &'c Collection<E>) -> Self {
        Self::with_mode(collection, false)
    }

    /// Starts a read-only transaction.
    pub fn read_only(collection: &'c Collection<E>) -> Self {
        Self::with_mode(collection, true)
    }

    pub fn with_mode(collection: &'c Collection<E>, read_only: bool) -> Self {
        let active = collection.acquire(read_only);
        Self { collection, active }
    }

    /// Returns true if the namespace was successfully opened or joined.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Runs `f` against the namespace's store.
    ///
    /// Returns [`PrefsError::Inactive`] without touching the engine if the
    /// transaction is inactive. `f` runs outside any critical section.
    ///
    /// # Panics
    /// The engine is lent to `f` for its duration; accessing other
    /// preferences of the same collection from inside `f` panics.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut Store<'_, E>) -> R) -> Result<R, PrefsError> {
        if !self.active {
            return Err(PrefsError::Inactive);
        }
        Ok(self
            .collection
            .with_engine(|engine| f(&mut Store::new(engine))))
    }
}

impl<'c, E: Engine> Drop for Transaction<'c, E> {
    fn drop(&mut self) {
        if self.active {
            self.collection.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::test_support::test_collection;

    #[test]
    fn direct_store_access() {
        let col = test_collection();
        {
            assert!(!col.in_transaction());
            let t = Transaction::new(&col);
            assert!(col.in_transaction());
            t.with_store(|store| {
                assert!(!store.is_key("pref_int"));
                assert_eq!(store.read::<i32>("pref_int"), Err(PrefsError::NotFound));
                store.write("pref_int", &999i32).unwrap();
                assert!(store.is_key("pref_int"));
                assert_eq!(store.read::<i32>("pref_int"), Ok(999));
                assert_eq!(store.read::<u32>("pref_int"), Err(PrefsError::WrongType));
            })
            .unwrap();
        }
        {
            let t = Transaction::new(&col);
            t.with_store(|store| {
                assert_eq!(store.read::<i32>("pref_int"), Ok(999));
                store.clear("pref_int").unwrap();
                assert!(!store.is_key("pref_int"));
            })
            .unwrap();
        }
        {
            let t = Transaction::read_only(&col);
            t.with_store(|store| {
                assert_eq!(store.read::<i32>("pref_int"), Err(PrefsError::NotFound));
            })
            .unwrap();
        }
        assert!(!col.in_transaction());
    }

    #[test]
    fn nested_transactions_share_one_open() {
        let col = test_collection();
        {
            let outer = Transaction::new(&col);
            assert!(outer.is_active());
            {
                let inner = Transaction::read_only(&col);
                assert!(inner.is_active());
                let innermost = Transaction::new(&col);
                assert!(innermost.is_active());
            }
            assert!(col.in_transaction());
            assert_eq!(col.with_engine(|e| e.stats().ends), 0);
        }
        assert!(!col.in_transaction());
        let stats = col.with_engine(|e| e.stats());
        assert_eq!((stats.begins, stats.ends), (1, 1));
    }

    #[test]
    fn inactive_transaction_fails_loudly_and_releases_nothing() {
        let col = test_collection();
        let ro = Transaction::read_only(&col);
        {
            let rw = Transaction::new(&col);
            assert!(!rw.is_active());
            assert_eq!(rw.with_store(|_| ()), Err(PrefsError::Inactive));
        }
        // The refused transaction did not release the read-only one.
        assert!(col.in_transaction());
        assert!(ro.with_store(|_| ()).is_ok());
        drop(ro);
        assert!(!col.in_transaction());
    }

    #[test]
    fn failed_open_is_inactive() {
        let col = test_collection();
        col.with_engine(|e| e.set_fail_begin(true));
        let t = Transaction::read_only(&col);
        assert!(!t.is_active());
        assert!(!col.in_transaction());
        drop(t);
        assert_eq!(col.with_engine(|e| e.stats().ends), 0);
    }

    #[test]
    fn writes_through_read_only_transaction_fail() {
        let col = test_collection();
        let t = Transaction::read_only(&col);
        let result = t.with_store(|store| store.write("k", &1u8)).unwrap();
        assert_eq!(result, Err(PrefsError::Storage));
    }

    #[test]
    fn engine_is_returned_after_store_access() {
        let col = test_collection();
        {
            let t = Transaction::new(&col);
            t.with_store(|store| store.write("k", &5u8)).unwrap().unwrap();
            t.with_store(|store| store.write("k", &6u8)).unwrap().unwrap();
        }
        let stats = col.with_engine(|e| e.stats());
        assert_eq!((stats.begins, stats.writes, stats.ends), (1, 2, 1));
    }

    #[test]
    #[should_panic(expected = "already in use")]
    fn reentrant_engine_access_panics() {
        let col = test_collection();
        let t = Transaction::new(&col);
        let _ = t.with_store(|_| col.with_engine(|e| e.stats()));
    }
}
