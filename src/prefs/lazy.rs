use core::{cell::RefCell, time::Duration};

use critical_section::Mutex;

use crate::prefs::{
    PrefsError,
    collection::Collection,
    engine::Engine,
    pref::Pref,
    scheduler::{Instant, Priority, Scheduler, SingletonTask},
    value::PrefValue,
};

/// Wait after the last change before writing.
pub const DEFAULT_STABLE_LATENCY: Duration = Duration::from_secs(2);
/// Longest a changing value goes unwritten after the previous write.
pub const DEFAULT_UNSTABLE_LATENCY: Duration = Duration::from_secs(10);

struct LazyState<T> {
    // Present exactly while the flush task is scheduled.
    pending: Option<T>,
    last_change: Instant,
    last_write: Option<Instant>,
    task: SingletonTask,
}

enum Due<T> {
    Idle,
    Early(Instant, Priority),
    Ready(T, bool),
}

/// A [`Pref`] whose writes are deferred and coalesced.
///
/// `set` only records the value. A write happens once the value has stayed
/// unchanged for the stable latency, or, if it keeps changing, once the
/// unstable latency has passed since the previous write. This bounds flash
/// wear for values that change often while still persisting settled values
/// quickly.
///
/// The pref asks its [`Scheduler`] for wakeups; the host must call
/// [`run_due`](Self::run_due) when they fire.
///
/// ```
/// use core::time::Duration;
/// use embedded_prefs::prefs::{Collection, LazyWritePref, ManualScheduler, MemoryEngine};
///
/// let col = Collection::new("foo", MemoryEngine::<8, 32>::new());
/// let sched = ManualScheduler::new();
/// let brightness = LazyWritePref::new(&col, &sched, "bright", 50u8);
///
/// brightness.set(80);
/// assert_eq!(brightness.get(), 80);
/// assert!(brightness.is_pending());
///
/// sched.advance(Duration::from_secs(2));
/// assert!(brightness.run_due());
/// assert!(!brightness.is_pending());
/// ```
pub struct LazyWritePref<'c, 's, T: PrefValue, E: Engine, S: Scheduler> {
    pref: Pref<'c, T, E>,
    scheduler: &'s S,
    stable: Duration,
    unstable: Duration,
    state: Mutex<RefCell<LazyState<T>>>,
}

impl<'c, 's, T, E, S> core::fmt::Debug for LazyWritePref<'c, 's, T, E, S>
where
    T: PrefValue + core::fmt::Debug,
    E: Engine,
    S: Scheduler,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LazyWritePref")
            .field("pref", &self.pref)
            .field("stable", &self.stable)
            .field("unstable", &self.unstable)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl<'c, 's, T: PrefValue, E: Engine, S: Scheduler> LazyWritePref<'c, 's, T, E, S> {
    /// Creates a lazy pref with the default 2 s / 10 s latencies.
    pub const fn new(
        collection: &'c Collection<E>,
        scheduler: &'s S,
        key: &'static str,
        default: T,
    ) -> Self {
        Self::with_latencies(
            Pref::new(collection, key, default),
            scheduler,
            DEFAULT_STABLE_LATENCY,
            DEFAULT_UNSTABLE_LATENCY,
        )
    }

    /// Wraps `pref`. An unstable latency shorter than the stable one is
    /// raised to match it.
    pub const fn with_latencies(
        pref: Pref<'c, T, E>,
        scheduler: &'s S,
        stable: Duration,
        unstable: Duration,
    ) -> Self {
        let unstable = if unstable.as_millis() < stable.as_millis() {
            stable
        } else {
            unstable
        };
        Self {
            pref,
            scheduler,
            stable,
            unstable,
            state: Mutex::new(RefCell::new(LazyState {
                pending: None,
                last_change: Instant::ZERO,
                last_write: None,
                task: SingletonTask::new(),
            })),
        }
    }

    /// The wrapped pref, for reading what is actually persisted.
    pub fn pref(&self) -> &Pref<'c, T, E> {
        &self.pref
    }

    pub fn stable_latency(&self) -> Duration {
        self.stable
    }

    pub fn unstable_latency(&self) -> Duration {
        self.unstable
    }

    /// Returns true while a value is waiting to be written.
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).pending.is_some())
    }

    /// When the next flush attempt is due.
    pub fn next_flush(&self) -> Option<Instant> {
        critical_section::with(|cs| self.state.borrow_ref(cs).task.deadline().map(|(at, _)| at))
    }

    /// Records `value` for a deferred write.
    pub fn set(&self, value: T) {
        let pending = critical_section::with(|cs| self.state.borrow_ref(cs).pending.is_some());
        if !pending && self.pref.is_set() && self.pref.get() == value {
            return;
        }

        let now = self.scheduler.now();
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.pending.as_ref() == Some(&value) {
                return;
            }
            state.pending = Some(value);
            state.last_change = now;
            if !state.task.is_scheduled() {
                state
                    .task
                    .schedule_after(self.scheduler, self.stable, Priority::Normal);
            }
        });
    }

    /// The pending value if there is one, else the persisted value.
    pub fn get(&self) -> T {
        let pending = critical_section::with(|cs| self.state.borrow_ref(cs).pending.clone());
        match pending {
            Some(value) => value,
            None => self.pref.get(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.is_pending() || self.pref.is_set()
    }

    /// Drops any pending value and removes the persisted one.
    pub fn clear(&self) -> Result<(), PrefsError> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.pending = None;
            state.task.cancel();
        });
        self.pref.clear()
    }

    /// Services a wakeup. Returns true if the pending value was written.
    ///
    /// Before the flush deadline, only repeats the wakeup request, so a
    /// scheduler shared with other prefs learns about it again. Writes once
    /// the value has settled or the previous write is old enough; otherwise,
    /// or if the write fails, schedules another attempt at background
    /// priority.
    pub fn run_due(&self) -> bool {
        let now = self.scheduler.now();
        let due = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.task.take_due(now) {
                return match state.task.deadline() {
                    Some((at, priority)) => Due::Early(at, priority),
                    None => Due::Idle,
                };
            }
            let Some(value) = state.pending.clone() else {
                return Due::Idle;
            };
            let settled = now.saturating_duration_since(state.last_change) >= self.stable;
            let overdue = state
                .last_write
                .is_none_or(|at| now.saturating_duration_since(at) >= self.unstable);
            Due::Ready(value, settled || overdue)
        });
        let (value, write) = match due {
            Due::Ready(value, write) => (value, write),
            Due::Early(at, priority) => {
                self.scheduler.wake_at(at, priority);
                return false;
            }
            Due::Idle => return false,
        };

        let written = write && self.pref.set(value.clone()).is_ok();
        log::debug!(
            "flush {}: write={} written={}",
            self.pref.key(),
            write,
            written
        );

        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if written {
                state.last_write = Some(now);
                if state.pending.as_ref() == Some(&value) {
                    state.pending = None;
                    return;
                }
            }
            if state.pending.is_some() {
                let delay = self.retry_delay(state.last_write, now);
                state
                    .task
                    .schedule_after(self.scheduler, delay, Priority::Background);
            }
        });
        written
    }

    /// Writes the pending value immediately, ignoring latencies.
    ///
    /// Meant for shutdown paths such as entering deep sleep.
    pub fn flush(&self) -> Result<(), PrefsError> {
        let pending = critical_section::with(|cs| self.state.borrow_ref(cs).pending.clone());
        let Some(value) = pending else {
            return Ok(());
        };
        self.pref.set(value.clone())?;

        let now = self.scheduler.now();
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.last_write = Some(now);
            if state.pending.as_ref() == Some(&value) {
                state.pending = None;
                state.task.cancel();
            }
        });
        Ok(())
    }

    // Never lets a retry land past the backstop deadline.
    fn retry_delay(&self, last_write: Option<Instant>, now: Instant) -> Duration {
        match last_write {
            Some(at) => {
                let backstop = at.saturating_add(self.unstable);
                if backstop > now {
                    self.stable.min(backstop.saturating_duration_since(now))
                } else {
                    self.stable
                }
            }
            None => self.stable,
        }
    }
}

pub type LazyBool<'c, 's, E, S> = LazyWritePref<'c, 's, bool, E, S>;
pub type LazyU8<'c, 's, E, S> = LazyWritePref<'c, 's, u8, E, S>;
pub type LazyI8<'c, 's, E, S> = LazyWritePref<'c, 's, i8, E, S>;
pub type LazyU16<'c, 's, E, S> = LazyWritePref<'c, 's, u16, E, S>;
pub type LazyI16<'c, 's, E, S> = LazyWritePref<'c, 's, i16, E, S>;
pub type LazyU32<'c, 's, E, S> = LazyWritePref<'c, 's, u32, E, S>;
pub type LazyI32<'c, 's, E, S> = LazyWritePref<'c, 's, i32, E, S>;
pub type LazyU64<'c, 's, E, S> = LazyWritePref<'c, 's, u64, E, S>;
pub type LazyI64<'c, 's, E, S> = LazyWritePref<'c, 's, i64, E, S>;
pub type LazyFloat<'c, 's, E, S> = LazyWritePref<'c, 's, f32, E, S>;
pub type LazyDouble<'c, 's, E, S> = LazyWritePref<'c, 's, f64, E, S>;
