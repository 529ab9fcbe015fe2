//! # Port Seams
//!
//! The scheduler consumes two services from the platform: a monotonic
//! timebase and a way to sleep until the next interrupt. Both are traits so
//! the dispatch loop runs unchanged on target (`arch::cortex_m4`) and on a
//! host simulation.

/// Time in microseconds since an arbitrary, fixed origin.
pub type Micros = u64;

/// A monotonically increasing time source.
pub trait Timebase {
    /// Current time. Must never go backwards.
    fn now(&self) -> Micros;
}

impl<T: Timebase + ?Sized> Timebase for &T {
    #[inline]
    fn now(&self) -> Micros {
        (**self).now()
    }
}

/// Low-power idle provided by the platform.
pub trait Sleep {
    /// Sleep until the next interrupt, unless `has_work` reports work.
    ///
    /// Implementations must evaluate `has_work` with interrupts masked and
    /// enter sleep without unmasking in between, otherwise an event posted
    /// between the check and the sleep instruction waits for the next
    /// unrelated interrupt.
    fn sleep_until_interrupt<F>(&self, has_work: F)
    where
        F: FnOnce() -> bool;
}

#[cfg(target_has_atomic = "64")]
pub use manual::ManualClock;

#[cfg(target_has_atomic = "64")]
mod manual {
    use core::sync::atomic::{AtomicU64, Ordering};

    use super::{Micros, Timebase};

    /// A timebase advanced by hand, for host simulation and tests.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        now: AtomicU64,
    }

    impl ManualClock {
        /// A clock reading `start` until moved.
        pub const fn new(start: Micros) -> Self {
            Self {
                now: AtomicU64::new(start),
            }
        }

        /// Move time forward by `delta` microseconds.
        pub fn advance(&self, delta: Micros) {
            self.now.fetch_add(delta, Ordering::SeqCst);
        }

        /// Jump to an absolute time. Panics if that would move backwards.
        pub fn set(&self, now: Micros) {
            let previous = self.now.swap(now, Ordering::SeqCst);
            assert!(now >= previous, "timebase moved backwards");
        }
    }

    impl Timebase for ManualClock {
        fn now(&self) -> Micros {
            self.now.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(50);
        assert_eq!(clock.now(), 150);
        clock.set(1_000);
        assert_eq!((&clock).now(), 1_000);
    }

    #[test]
    #[should_panic(expected = "backwards")]
    fn test_manual_clock_rejects_rewind() {
        let clock = ManualClock::new(10);
        clock.set(5);
    }
}
