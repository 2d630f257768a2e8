//! Time source and wakeup requests for delayed writes.
//!
//! The crate never spawns tasks or registers callbacks. A
//! [`LazyWritePref`](crate::prefs::LazyWritePref) asks its [`Scheduler`] to
//! wake the host at some instant, and the host loop calls
//! [`run_due`](crate::prefs::LazyWritePref::run_due) once that instant has
//! passed. Calling `run_due` early or more than once is harmless.

use core::{cell::Cell, time::Duration};

use critical_section::Mutex;

/// Monotonic uptime with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    pub fn saturating_add(self, d: Duration) -> Instant {
        Instant(self.0.saturating_add(millis(d)))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// How urgently the host should service a wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// First attempt after a change.
    #[default]
    Normal,
    /// Retries while a value is still changing, or after a failed write.
    Background,
}

/// Host clock and wakeup sink.
pub trait Scheduler {
    /// Current monotonic time.
    fn now(&self) -> Instant;

    /// Requests a call to `run_due` at or after `at`.
    ///
    /// Several prefs may share one scheduler, so a request must not cancel
    /// an earlier outstanding one. An implementation with a single timer
    /// keeps the earliest deadline; a pref woken before its own deadline
    /// requests it again from `run_due`.
    fn wake_at(&self, at: Instant, priority: Priority);
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn wake_at(&self, at: Instant, priority: Priority) {
        (**self).wake_at(at, priority)
    }
}

/// A single outstanding deadline.
///
/// Scheduling again replaces the previous deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingletonTask {
    due: Option<(Instant, Priority)>,
}

impl SingletonTask {
    pub const fn new() -> Self {
        Self { due: None }
    }

    /// Sets the deadline to `delay` from now and forwards it to `scheduler`.
    pub fn schedule_after<S: Scheduler + ?Sized>(
        &mut self,
        scheduler: &S,
        delay: Duration,
        priority: Priority,
    ) -> Instant {
        let at = scheduler.now().saturating_add(delay);
        self.due = Some((at, priority));
        scheduler.wake_at(at, priority);
        at
    }

    pub fn is_scheduled(&self) -> bool {
        self.due.is_some()
    }

    /// Deadline and priority of the outstanding request, if any.
    pub fn deadline(&self) -> Option<(Instant, Priority)> {
        self.due
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// Consumes the deadline if it has passed at `now`.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some((at, _)) if at <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Scheduler driven by an explicitly advanced clock.
///
/// Useful in tests, and on hosts that already track uptime themselves and
/// only want to know when to call back. It models a single timer: only the
/// earliest outstanding wakeup is kept, and the host calls `run_due` on all
/// of its prefs when it fires.
pub struct ManualScheduler {
    now: Mutex<Cell<Instant>>,
    wake: Mutex<Cell<Option<(Instant, Priority)>>>,
    requests: Mutex<Cell<u32>>,
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("wake", &self.last_wake())
            .finish_non_exhaustive()
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub const fn new() -> Self {
        Self {
            now: Mutex::new(Cell::new(Instant::ZERO)),
            wake: Mutex::new(Cell::new(None)),
            requests: Mutex::new(Cell::new(0)),
        }
    }

    pub fn set_now(&self, now: Instant) {
        critical_section::with(|cs| self.now.borrow(cs).set(now));
    }

    pub fn advance(&self, d: Duration) {
        critical_section::with(|cs| {
            let now = self.now.borrow(cs);
            now.set(now.get().saturating_add(d));
        });
    }

    /// Earliest outstanding wakeup.
    pub fn last_wake(&self) -> Option<(Instant, Priority)> {
        critical_section::with(|cs| self.wake.borrow(cs).get())
    }

    /// Returns true once the outstanding wakeup is due, clearing it.
    pub fn take_due(&self) -> bool {
        critical_section::with(|cs| {
            let wake = self.wake.borrow(cs);
            match wake.get() {
                Some((at, _)) if at <= self.now.borrow(cs).get() => {
                    wake.set(None);
                    true
                }
                _ => false,
            }
        })
    }

    /// Total number of wakeup requests received.
    pub fn requests(&self) -> u32 {
        critical_section::with(|cs| self.requests.borrow(cs).get())
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        critical_section::with(|cs| self.now.borrow(cs).get())
    }

    fn wake_at(&self, at: Instant, priority: Priority) {
        critical_section::with(|cs| {
            let wake = self.wake.borrow(cs);
            match wake.get() {
                Some((earlier, _)) if earlier <= at => {}
                _ => wake.set(Some((at, priority))),
            }
            let requests = self.requests.borrow(cs);
            requests.set(requests.get().saturating_add(1));
        });
    }
}
