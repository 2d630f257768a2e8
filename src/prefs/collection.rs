use core::cell::Cell;

use critical_section::Mutex;

use crate::prefs::engine::Engine;

#[derive(Debug, Clone, Copy)]
struct OpenState {
    refcount: u32,
    read_only: bool,
}

/// A preferences namespace, owning the engine that stores it.
///
/// Transactions on a collection are reference counted: the engine's
/// `begin` runs when the first transaction opens and `end` when the last one
/// drops, no matter how deeply transactions nest. Preferences that belong
/// together should share a collection so grouped accesses cost a single
/// open/close.
///
/// Interior state is guarded by short critical sections, so a collection can
/// be declared as a `static` and shared by reference. Engine calls run
/// outside of them: the engine is lent out for each call and returned
/// afterwards.
///
/// ```
/// use embedded_prefs::prefs::{Collection, Transaction, MemoryEngine};
///
/// let col = Collection::new("settings", MemoryEngine::<8, 32>::new());
/// {
///     let t = Transaction::new(&col);
///     let _inner = Transaction::read_only(&col); // no second open
///     t.with_store(|store| store.write("volume", &7u8)).unwrap().unwrap();
/// }
/// assert!(!col.in_transaction());
/// ```
pub struct Collection<E: Engine> {
    name: &'static str,
    // `None` while the engine is lent out to a caller.
    engine: Mutex<Cell<Option<E>>>,
    state: Mutex<Cell<OpenState>>,
}

// Puts a lent engine back, also when the borrower panics.
struct Lease<'a, E> {
    home: &'a Mutex<Cell<Option<E>>>,
    engine: Option<E>,
}

impl<E> Drop for Lease<'_, E> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            critical_section::with(|cs| self.home.borrow(cs).set(Some(engine)));
        }
    }
}

impl<E: Engine> core::fmt::Debug for Collection<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Collection<E> {
    /// Creates a collection for namespace `name`. The engine is not opened
    /// until the first transaction.
    pub const fn new(name: &'static str, engine: E) -> Self {
        Self {
            name,
            engine: Mutex::new(Cell::new(Some(engine))),
            state: Mutex::new(Cell::new(OpenState {
                refcount: 0,
                read_only: true,
            })),
        }
    }

    /// Namespace name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true while at least one transaction holds the namespace open.
    pub fn in_transaction(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().refcount > 0)
    }

    /// Returns true if the namespace is currently open read-only.
    ///
    /// Meaningless while no transaction is active.
    pub fn is_read_only(&self) -> bool {
        critical_section::with(|cs| self.state.borrow(cs).get().read_only)
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// The engine is taken out of the collection for the duration of `f` and
    /// put back afterwards, even if `f` panics. `f` runs outside any critical
    /// section. Transactions are bypassed, which makes this suitable for
    /// diagnostics and bring-up.
    ///
    /// # Panics
    /// Panics if the engine is already in use, e.g. when called from inside
    /// [`Transaction::with_store`](crate::prefs::Transaction::with_store).
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        let taken = critical_section::with(|cs| self.engine.borrow(cs).take());
        if taken.is_none() {
            panic!("engine of preferences {} is already in use", self.name);
        }
        let mut lease = Lease {
            home: &self.engine,
            engine: taken,
        };
        let Some(engine) = lease.engine.as_mut() else {
            unreachable!()
        };
        f(engine)
    }

    /// Opens the namespace or joins the open one.
    ///
    /// Fails if the engine cannot be opened, or if the namespace is open
    /// read-only and read-write access is requested.
    pub(crate) fn acquire(&self, read_only: bool) -> bool {
        let state = critical_section::with(|cs| self.state.borrow(cs).get());

        if state.refcount == 0 {
            if !self.with_engine(|engine| engine.begin(self.name, read_only)) {
                if read_only {
                    log::warn!("failed to open preferences {} for reading", self.name);
                } else {
                    log::error!("failed to open preferences {} for writing", self.name);
                }
                return false;
            }
            critical_section::with(|cs| {
                self.state.borrow(cs).set(OpenState {
                    refcount: 1,
                    read_only,
                })
            });
            return true;
        }

        if state.read_only && !read_only {
            log::debug!(
                "preferences {} are open read-only, cannot write in this scope",
                self.name
            );
            return false;
        }

        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let state = cell.get();
            match state.refcount.checked_add(1) {
                Some(refcount) => {
                    cell.set(OpenState { refcount, ..state });
                    true
                }
                None => false,
            }
        })
    }

    /// Leaves the namespace, closing it when the last holder leaves.
    pub(crate) fn release(&self) {
        let closed = critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            debug_assert!(state.refcount > 0, "unbalanced release of {}", self.name);
            state.refcount = state.refcount.saturating_sub(1);
            cell.set(state);
            state.refcount == 0
        });
        if closed {
            self.with_engine(|engine| engine.end());
        }
    }
}
