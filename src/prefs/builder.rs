use core::{marker::PhantomData, time::Duration};

use crate::prefs::{
    collection::Collection,
    engine::Engine,
    lazy::{DEFAULT_STABLE_LATENCY, DEFAULT_UNSTABLE_LATENCY, LazyWritePref},
    pref::Pref,
    scheduler::Scheduler,
    value::PrefValue,
};

// Builder states
pub struct NeedPref;
pub struct NeedScheduler;
pub struct Ready;

/// Step-by-step construction of a [`LazyWritePref`] with custom latencies.
///
/// ```
/// use core::time::Duration;
/// use embedded_prefs::prefs::{Collection, LazyWritePrefBuilder, ManualScheduler, MemoryEngine};
///
/// let col = Collection::new("sensors", MemoryEngine::<8, 32>::new());
/// let sched = ManualScheduler::new();
/// let offset = LazyWritePrefBuilder::new()
///     .pref(&col, "offset", 0i16)
///     .scheduler(&sched)
///     .stable_latency(Duration::from_secs(5))
///     .unstable_latency(Duration::from_secs(60))
///     .build();
///
/// assert_eq!(offset.unstable_latency(), Duration::from_secs(60));
/// ```
pub struct LazyWritePrefBuilder<P, S, State> {
    pref: P,
    scheduler: S,
    stable: Duration,
    unstable: Duration,
    _phantom: PhantomData<State>,
}

impl Default for LazyWritePrefBuilder<(), (), NeedPref> {
    fn default() -> Self {
        Self::new()
    }
}

// Start the builder
impl LazyWritePrefBuilder<(), (), NeedPref> {
    pub fn new() -> Self {
        LazyWritePrefBuilder {
            pref: (),
            scheduler: (),
            stable: DEFAULT_STABLE_LATENCY,
            unstable: DEFAULT_UNSTABLE_LATENCY,
            _phantom: PhantomData,
        }
    }

    /// Binds the preference to `key` in `collection`.
    pub fn pref<'c, T: PrefValue, E: Engine>(
        self,
        collection: &'c Collection<E>,
        key: &'static str,
        default: T,
    ) -> LazyWritePrefBuilder<Pref<'c, T, E>, (), NeedScheduler> {
        self.wrap(Pref::new(collection, key, default))
    }

    /// Wraps an existing pref.
    pub fn wrap<'c, T: PrefValue, E: Engine>(
        self,
        pref: Pref<'c, T, E>,
    ) -> LazyWritePrefBuilder<Pref<'c, T, E>, (), NeedScheduler> {
        LazyWritePrefBuilder {
            pref,
            scheduler: (),
            stable: self.stable,
            unstable: self.unstable,
            _phantom: PhantomData,
        }
    }
}

// Set scheduler
impl<'c, T: PrefValue, E: Engine> LazyWritePrefBuilder<Pref<'c, T, E>, (), NeedScheduler> {
    pub fn scheduler<'s, S: Scheduler>(
        self,
        scheduler: &'s S,
    ) -> LazyWritePrefBuilder<Pref<'c, T, E>, &'s S, Ready> {
        LazyWritePrefBuilder {
            pref: self.pref,
            scheduler,
            stable: self.stable,
            unstable: self.unstable,
            _phantom: PhantomData,
        }
    }
}

// Tune and build
impl<'c, 's, T: PrefValue, E: Engine, S: Scheduler>
    LazyWritePrefBuilder<Pref<'c, T, E>, &'s S, Ready>
{
    /// How long a value must stay unchanged before it is written.
    pub fn stable_latency(mut self, latency: Duration) -> Self {
        self.stable = latency;
        self
    }

    /// Longest a changing value may go unwritten after the previous write.
    ///
    /// Raised to the stable latency at build time if shorter.
    pub fn unstable_latency(mut self, latency: Duration) -> Self {
        self.unstable = latency;
        self
    }

    pub fn build(self) -> LazyWritePref<'c, 's, T, E, S> {
        LazyWritePref::with_latencies(self.pref, self.scheduler, self.stable, self.unstable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{ManualScheduler, test_support::test_collection};

    #[test]
    fn test_defaults() {
        let col = test_collection();
        let sched = ManualScheduler::new();
        let p = LazyWritePrefBuilder::new()
            .pref(&col, "k", 0u32)
            .scheduler(&sched)
            .build();
        assert_eq!(p.stable_latency(), Duration::from_secs(2));
        assert_eq!(p.unstable_latency(), Duration::from_secs(10));
        assert_eq!(p.pref().key(), "k");
    }

    #[test]
    fn test_custom_latencies_are_clamped() {
        let col = test_collection();
        let sched = ManualScheduler::new();
        let p = LazyWritePrefBuilder::new()
            .wrap(Pref::new(&col, "k", false))
            .scheduler(&sched)
            .stable_latency(Duration::from_secs(30))
            .unstable_latency(Duration::from_secs(3))
            .build();
        assert_eq!(p.stable_latency(), Duration::from_secs(30));
        assert_eq!(p.unstable_latency(), Duration::from_secs(30));

        p.set(true);
        assert_eq!(p.next_flush().map(|at| at.as_millis()), Some(30_000));
    }
}
