//! # tickloop: cooperative event and timer scheduler
//!
//! A run-to-completion scheduler for single-core microcontrollers. Tasks are
//! plain functions; the main loop calls them when they have events queued or
//! when their timer comes due. Nothing is preempted and no task has a stack
//! of its own.
//!
//! ## Overview
//!
//! Every task is declared up front in a static registry and addressed by its
//! index. There are three kinds:
//!
//! - **Event tasks** own a ring buffer of events plus a small priority slot.
//!   Priority events are delivered first. A handler returning `true` flushes
//!   whatever is left of the queue its event came from.
//! - **Continuous timed tasks** fire every `period` microseconds. The next
//!   deadline advances by exactly one period so the schedule does not drift.
//! - **One-shot timed tasks** fire once and disable themselves until
//!   re-enabled.
//!
//! Interrupt handlers and other tasks hand work over with
//! [`Scheduler::post`] and [`Scheduler::post_priority`].
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Application handlers (fn(A) -> bool)       │
//! ├────────────────────────────────────────────────────────┤
//! │                Scheduler (scheduler.rs)                 │
//! │   init() · run() · run_once() · post() · enable() ...   │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Task model  │   Event queues     │  Tick tasks       │
//! │  task.rs     │   queue.rs         │  tick.rs          │
//! │  ─ kinds     │   ─ ring index     │  ─ on_tick()      │
//! │  ─ timers    │   ─ priority slot  │                   │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │   Ports (port.rs) · Faults (fault.rs) · Sync (sync.rs)  │
//! ├────────────────────────────────────────────────────────┤
//! │         Arch port (arch/cortex_m4.rs): SysTick · WFI    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No heap**: queues are caller-provided statics ([`EventStorage`])
//! - **Fixed registry**: `[TaskDescriptor; N]`, known at compile time
//! - **Critical sections**: all shared state sits behind
//!   `critical_section::Mutex`, so `post` is safe from interrupt context
//!
//! ## Example
//!
//! ```
//! use tickloop::{EventStorage, ManualClock, Scheduler, TaskDescriptor};
//!
//! static QUEUE: EventStorage<u16, 8> = EventStorage::new();
//! static CLOCK: ManualClock = ManualClock::new(0);
//!
//! fn on_event(_event: u16) -> bool {
//!     false
//! }
//! fn heartbeat(_event: u16) -> bool {
//!     false
//! }
//!
//! static TASKS: [TaskDescriptor<'static, u16>; 2] = [
//!     TaskDescriptor::event(on_event, &QUEUE),
//!     TaskDescriptor::continuous(heartbeat, 10_000),
//! ];
//! static SCHEDULER: Scheduler<'static, u16, &'static ManualClock, 2> =
//!     Scheduler::new(&TASKS, &CLOCK);
//!
//! SCHEDULER.init();
//! SCHEDULER.post(0, 42).unwrap();
//! assert!(SCHEDULER.run_once());
//! assert!(!SCHEDULER.run_once());
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod fault;
pub mod port;
pub mod queue;
pub mod scheduler;
pub mod sync;
pub mod task;
#[cfg(feature = "tick-tasks")]
pub mod tick;
pub mod arch;

pub use config::Arg;
pub use error::{ConfigError, Error};
pub use fault::Fault;
#[cfg(target_has_atomic = "64")]
pub use port::ManualClock;
pub use port::{Micros, Sleep, Timebase};
pub use queue::{DefaultEventStorage, EventBuffer, EventStorage};
pub use scheduler::{DefaultScheduler, Scheduler};
pub use task::{DefaultTaskDescriptor, Handler, TaskArg, TaskDescriptor, TaskId, TaskKind};
#[cfg(feature = "tick-tasks")]
pub use tick::{TickHandler, TickRunner, TickTaskDescriptor};
