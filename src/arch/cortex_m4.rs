//! # Cortex-M4 Port Layer
//!
//! SysTick-driven timebase and WFI-based sleep for the scheduler.
//!
//! ## Wiring
//!
//! The application owns the `SysTick` exception and forwards it:
//!
//! ```ignore
//! #[exception]
//! fn SysTick() {
//!     cortex_m4::on_systick();
//!     TICKER.on_tick();
//! }
//! ```
//!
//! `on_systick` advances a 64-bit tick counter under a critical section;
//! `SysTickClock` converts it to microseconds. The counter is 64 bits wide
//! because Cortex-M4 has no 64-bit atomics and a 32-bit microsecond clock
//! wraps after about 71 minutes.

use core::cell::Cell;

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ, TICK_PERIOD_US};
use crate::port::{Micros, Sleep, Timebase};
use crate::sync::{critical_section, Mutex};

static TICKS: Mutex<Cell<u64>> = Mutex::new(Cell::new(0));

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `TICK_HZ` from the processor clock.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Advance the timebase by one tick. Call from the `SysTick` handler.
#[inline]
pub fn on_systick() {
    critical_section(|cs| {
        let ticks = TICKS.borrow(cs);
        ticks.set(ticks.get() + 1);
    });
}

// ---------------------------------------------------------------------------
// Scheduler seams
// ---------------------------------------------------------------------------

/// Timebase counting SysTick interrupts. Resolution is one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTickClock;

impl Timebase for SysTickClock {
    fn now(&self) -> Micros {
        critical_section(|cs| TICKS.borrow(cs).get()) * TICK_PERIOD_US
    }
}

/// Sleep with `wfi`.
///
/// The work check and the `wfi` run with interrupts masked. A pending
/// interrupt still wakes the core, and its handler runs as soon as the mask
/// is lifted, so an event posted right after the check is not missed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wfi;

impl Sleep for Wfi {
    fn sleep_until_interrupt<F>(&self, has_work: F)
    where
        F: FnOnce() -> bool,
    {
        cortex_m::interrupt::free(|_| {
            if !has_work() {
                cortex_m::asm::wfi();
            }
        });
    }
}
