//! # Tick Tasks
//!
//! Lightweight handlers run directly from the timer interrupt, once every
//! `period_ticks` ticks. They bypass the event queues entirely, so they must
//! be short and must not block. Posting events to the scheduler from a tick
//! task is fine; that is the usual way to hand work to the main loop.
//!
//! ```ignore
//! static TICK_TASKS: [TickTaskDescriptor; 1] = [TickTaskDescriptor::new(scan_keys, 10)];
//! static TICKER: TickRunner<'static, 1> = TickRunner::new(&TICK_TASKS);
//!
//! #[exception]
//! fn SysTick() {
//!     TICKER.on_tick();
//! }
//! ```

use core::cell::{Cell, RefCell};

use log::{debug, info};

use crate::error::{ConfigError, Error};
use crate::fault::{self, Fault};
use crate::sync::{critical_section, Mutex};

/// Tick task handler. Receives the running tick count.
pub type TickHandler = fn(u32);

/// Static description of one tick task.
#[derive(Debug, Clone, Copy)]
pub struct TickTaskDescriptor {
    pub handler: TickHandler,
    pub period_ticks: u32,
    pub initially_enabled: bool,
}

impl TickTaskDescriptor {
    pub const fn new(handler: TickHandler, period_ticks: u32) -> Self {
        Self {
            handler,
            period_ticks,
            initially_enabled: true,
        }
    }

    pub const fn disabled(mut self) -> Self {
        self.initially_enabled = false;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct TickControl {
    enabled: bool,
    countdown: u32,
}

impl TickControl {
    const IDLE: Self = Self {
        enabled: false,
        countdown: 0,
    };
}

/// Runs the tick-task registry from the timer interrupt.
pub struct TickRunner<'a, const M: usize> {
    registry: &'a [TickTaskDescriptor; M],
    control: Mutex<RefCell<[TickControl; M]>>,
    ticks: Mutex<Cell<u32>>,
}

impl<'a, const M: usize> TickRunner<'a, M> {
    pub const fn new(registry: &'a [TickTaskDescriptor; M]) -> Self {
        Self {
            registry,
            control: Mutex::new(RefCell::new([TickControl::IDLE; M])),
            ticks: Mutex::new(Cell::new(0)),
        }
    }

    /// Reset every tick task to its descriptor. A zero period is fatal.
    pub fn init(&self) {
        if let Some(task) = self.registry.iter().position(|d| d.period_ticks == 0) {
            fault::halt(Fault::Config(ConfigError::ZeroTickPeriod { task }));
        }
        critical_section(|cs| {
            self.ticks.borrow(cs).set(0);
            let mut control = self.control.borrow_ref_mut(cs);
            for (state, descriptor) in control.iter_mut().zip(self.registry) {
                *state = TickControl {
                    enabled: descriptor.initially_enabled,
                    countdown: descriptor.period_ticks,
                };
            }
        });
        info!("tick: {} tick tasks initialized", M);
    }

    /// Advance one tick and run every tick task that came due.
    ///
    /// Call exactly once per timer interrupt.
    pub fn on_tick(&self) {
        let mut due = [false; M];
        let tick = critical_section(|cs| {
            let ticks = self.ticks.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));

            let mut control = self.control.borrow_ref_mut(cs);
            for ((state, descriptor), due) in control.iter_mut().zip(self.registry).zip(&mut due) {
                if !state.enabled {
                    continue;
                }
                state.countdown = state.countdown.saturating_sub(1);
                if state.countdown == 0 {
                    state.countdown = descriptor.period_ticks;
                    *due = true;
                }
            }
            ticks.get()
        });

        // Outside the borrow, so handlers may enable or disable tick tasks.
        for (descriptor, _) in self.registry.iter().zip(due).filter(|(_, due)| *due) {
            (descriptor.handler)(tick);
        }
    }

    /// Resume a tick task with a full period before its next run.
    pub fn enable(&self, id: usize) -> Result<(), Error> {
        let descriptor = self.descriptor(id)?;
        critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            if !control[id].enabled {
                control[id] = TickControl {
                    enabled: true,
                    countdown: descriptor.period_ticks,
                };
            }
        });
        debug!("tick: task {} enabled", id);
        Ok(())
    }

    /// Stop running a tick task. Its countdown restarts on `enable`.
    ///
    /// # Returns
    /// `Err(UnknownTask)` for an id outside the tick registry.
    pub fn disable(&self, id: usize) -> Result<(), Error> {
        self.descriptor(id)?;
        critical_section(|cs| self.control.borrow_ref_mut(cs)[id].enabled = false);
        debug!("tick: task {} disabled", id);
        Ok(())
    }

    /// Ticks counted since `init()`, wrapping.
    pub fn ticks(&self) -> u32 {
        critical_section(|cs| self.ticks.borrow(cs).get())
    }

    fn descriptor(&self, id: usize) -> Result<&'a TickTaskDescriptor, Error> {
        let registry = self.registry;
        registry.get(id).ok_or_else(|| {
            fault::report(Fault::UnknownTask { id, count: M });
            Error::UnknownTask(id)
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ManualClock;
    use crate::queue::EventStorage;
    use crate::scheduler::Scheduler;
    use crate::task::TaskDescriptor;

    std::thread_local! {
        static FIRED: RefCell<Vec<(&'static str, u32)>> = RefCell::new(Vec::new());
    }

    fn take_fired() -> Vec<(&'static str, u32)> {
        FIRED.with(|fired| fired.take())
    }

    fn every_tick(tick: u32) {
        FIRED.with(|fired| fired.borrow_mut().push(("fast", tick)));
    }

    fn every_third(tick: u32) {
        FIRED.with(|fired| fired.borrow_mut().push(("slow", tick)));
    }

    #[test]
    fn test_periods() {
        let registry = [
            TickTaskDescriptor::new(every_tick, 1),
            TickTaskDescriptor::new(every_third, 3),
        ];
        let runner = TickRunner::new(&registry);
        runner.init();

        for _ in 0..6 {
            runner.on_tick();
        }
        assert_eq!(runner.ticks(), 6);
        assert_eq!(
            take_fired(),
            [
                ("fast", 1),
                ("fast", 2),
                ("fast", 3),
                ("slow", 3),
                ("fast", 4),
                ("fast", 5),
                ("fast", 6),
                ("slow", 6),
            ]
        );
    }

    #[test]
    fn test_enable_disable() {
        let registry = [TickTaskDescriptor::new(every_third, 3).disabled()];
        let runner = TickRunner::new(&registry);
        runner.init();

        for _ in 0..5 {
            runner.on_tick();
        }
        assert!(take_fired().is_empty());

        // A full period elapses after enabling.
        runner.enable(0).unwrap();
        runner.on_tick();
        runner.on_tick();
        assert!(take_fired().is_empty());
        runner.on_tick();
        assert_eq!(take_fired(), [("slow", 8)]);

        runner.disable(0).unwrap();
        for _ in 0..6 {
            runner.on_tick();
        }
        assert!(take_fired().is_empty());
    }

    #[test]
    #[should_panic(expected = "zero tick period")]
    fn test_zero_period_halts_init() {
        let registry = [TickTaskDescriptor::new(every_tick, 0)];
        TickRunner::new(&registry).init();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_unknown_tick_task() {
        let registry = [TickTaskDescriptor::new(every_tick, 1)];
        let runner = TickRunner::new(&registry);
        runner.init();
        let _ = runner.enable(4);
    }

    #[test]
    fn test_tick_task_posts_to_scheduler() {
        type Sched = Scheduler<'static, u8, &'static ManualClock, 1>;

        static QUEUE: EventStorage<u8, 4> = EventStorage::new();
        static CLOCK: ManualClock = ManualClock::new(0);
        static TASKS: [TaskDescriptor<'static, u8>; 1] = [TaskDescriptor::event(on_key, &QUEUE)];
        static SCHEDULER: Sched = Scheduler::new(&TASKS, &CLOCK);
        static TICK_TASKS: [TickTaskDescriptor; 1] = [TickTaskDescriptor::new(scan, 2)];

        std::thread_local! {
            static KEYS: RefCell<Vec<u8>> = RefCell::new(Vec::new());
        }
        fn scan(tick: u32) {
            let _ = SCHEDULER.post(0, tick as u8);
        }
        fn on_key(key: u8) -> bool {
            KEYS.with(|keys| keys.borrow_mut().push(key));
            false
        }

        SCHEDULER.init();
        let runner = TickRunner::new(&TICK_TASKS);
        runner.init();
        for _ in 0..6 {
            runner.on_tick();
        }
        assert!(SCHEDULER.run_once());
        assert_eq!(KEYS.with(|keys| keys.take()), [2, 4, 6]);
    }
}
