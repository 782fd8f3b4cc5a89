//! Delayed Restart Timer
//!
//! One-shot restart deadline shared between the control thread, which arms
//! and cancels it, and the timer context, which polls it. All access goes
//! through a critical section. Arming replaces any pending deadline; there
//! is never more than one.

use core::cell::Cell;

use critical_section::Mutex;

use crate::platform::Clock;

/// Arms and cancels the single delayed restart
pub trait RestartScheduler {
    /// Arm a restart `delay_ms` from now, replacing any pending one
    fn arm(&self, delay_ms: u32);

    /// Cancel the pending restart, if any
    fn cancel(&self);

    /// Check if a restart is armed
    fn is_pending(&self) -> bool;
}

impl<T: RestartScheduler + ?Sized> RestartScheduler for &T {
    fn arm(&self, delay_ms: u32) {
        (**self).arm(delay_ms);
    }

    fn cancel(&self) {
        (**self).cancel();
    }

    fn is_pending(&self) -> bool {
        (**self).is_pending()
    }
}

/// Polled one-shot deadline
///
/// The timer context calls [`TickScheduler::poll`] periodically; it reports
/// `true` exactly once per armed deadline.
pub struct TickScheduler<C> {
    clock: C,
    deadline_ms: Mutex<Cell<Option<u64>>>,
}

impl<C: Clock> TickScheduler<C> {
    /// Create an idle scheduler
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            deadline_ms: Mutex::new(Cell::new(None)),
        }
    }

    /// Time source of the scheduler
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Absolute deadline in clock milliseconds
    #[must_use]
    pub fn deadline_ms(&self) -> Option<u64> {
        critical_section::with(|cs| self.deadline_ms.borrow(cs).get())
    }

    /// Milliseconds until the pending restart fires
    #[must_use]
    pub fn remaining_ms(&self) -> Option<u64> {
        let now = self.clock.now_ms();
        self.deadline_ms().map(|at| at.saturating_sub(now))
    }

    /// Consume the deadline if it has passed
    ///
    /// Returns `true` once when the restart is due.
    pub fn poll(&self) -> bool {
        let now = self.clock.now_ms();
        critical_section::with(|cs| {
            let deadline = self.deadline_ms.borrow(cs);
            match deadline.get() {
                Some(at) if now >= at => {
                    deadline.set(None);
                    true
                }
                _ => false,
            }
        })
    }
}

impl<C: Clock> RestartScheduler for TickScheduler<C> {
    fn arm(&self, delay_ms: u32) {
        let at = self.clock.now_ms().saturating_add(u64::from(delay_ms));
        critical_section::with(|cs| self.deadline_ms.borrow(cs).set(Some(at)));
    }

    fn cancel(&self) {
        critical_section::with(|cs| self.deadline_ms.borrow(cs).set(None));
    }

    fn is_pending(&self) -> bool {
        self.deadline_ms().is_some()
    }
}

impl<C> core::fmt::Debug for TickScheduler<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let deadline = critical_section::with(|cs| self.deadline_ms.borrow(cs).get());
        f.debug_struct("TickScheduler")
            .field("deadline_ms", &deadline)
            .finish_non_exhaustive()
    }
}
