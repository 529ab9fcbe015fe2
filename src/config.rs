//! # tickloop Configuration
//!
//! Compile-time constants governing the scheduler. All limits are fixed at
//! compile time; no dynamic allocation.

/// Capacity of every event task's priority slot.
///
/// Timer timeouts are delivered through this slot as well, so a task that
/// uses `start_timer` should leave one entry free for them.
pub const MAX_PRIORITY_EVENTS: usize = 2;

/// SysTick frequency in Hz. Determines the timebase granularity on target.
pub const TICK_HZ: u32 = 1000;

/// Length of one tick in microseconds.
pub const TICK_PERIOD_US: u64 = 1_000_000 / TICK_HZ as u64;

/// System clock frequency in Hz (default for STM32F4 at 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Width of the main event queue indices. Bounds the capacity of a single
/// event queue to `QueueIndex::MAX`.
#[cfg(not(feature = "large-queues"))]
pub type QueueIndex = u8;

/// Width of the main event queue indices. Bounds the capacity of a single
/// event queue to `QueueIndex::MAX`.
#[cfg(feature = "large-queues")]
pub type QueueIndex = u16;

/// Largest queue capacity representable with the selected index width.
pub const MAX_QUEUE_CAPACITY: usize = QueueIndex::MAX as usize;

#[cfg(all(feature = "task-arg-8", feature = "task-arg-32"))]
compile_error!("features `task-arg-8` and `task-arg-32` are mutually exclusive");

/// Default task argument width for applications that don't pick one.
#[cfg(feature = "task-arg-8")]
pub type Arg = u8;

/// Default task argument width for applications that don't pick one.
#[cfg(feature = "task-arg-32")]
pub type Arg = u32;

/// Default task argument width for applications that don't pick one.
#[cfg(not(any(feature = "task-arg-8", feature = "task-arg-32")))]
pub type Arg = u16;

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskArg;

    #[test]
    fn test_arg_width_follows_features() {
        let width = core::mem::size_of::<Arg>();
        if cfg!(feature = "task-arg-8") {
            assert_eq!(width, 1);
        } else if cfg!(feature = "task-arg-32") {
            assert_eq!(width, 4);
        } else {
            assert_eq!(width, 2);
        }
    }

    #[test]
    fn test_arg_sentinels_sit_at_top_of_range() {
        assert_eq!(Arg::TIMEOUT_EVENT, Arg::MAX);
        assert_eq!(Arg::INIT_EVENT, Arg::MAX - 1);
        assert_eq!(Arg::MAX_PAYLOAD, Arg::MAX - 2);
        assert!(Arg::TIMEOUT_EVENT.is_sentinel());
        assert!(Arg::INIT_EVENT.is_sentinel());
        assert!(!Arg::MAX_PAYLOAD.is_sentinel());
    }

    #[test]
    fn test_tick_period() {
        assert_eq!(TICK_PERIOD_US * TICK_HZ as u64, 1_000_000);
        assert!(MAX_QUEUE_CAPACITY >= 255);
    }
}
