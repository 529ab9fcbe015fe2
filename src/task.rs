//! # Task Model
//!
//! Defines what a task is: its argument type, its immutable descriptor, and
//! the mutable runtime state the scheduler keeps for it.
//!
//! ## Task kinds
//!
//! ```text
//!   Event            Idle ──post──► HasPending ──drained──► Idle
//!
//!   TimedOneShot     Armed ──now >= next_due──► Fired (disabled)
//!                      ▲                           │
//!                      └──────── enable() ─────────┘
//!
//!   TimedContinuous  Armed ──now >= next_due──► Armed (next_due += period)
//! ```
//!
//! Descriptors are built with `const fn` constructors so a whole registry
//! can live in a `static`:
//!
//! ```ignore
//! static BUTTON_EVENTS: EventStorage<u16, 8> = EventStorage::new();
//!
//! static TASKS: [TaskDescriptor<'static, u16>; 2] = [
//!     TaskDescriptor::event(on_button, &BUTTON_EVENTS).run_on_init(),
//!     TaskDescriptor::continuous(on_blink, 500_000),
//! ];
//! ```

use core::fmt::Debug;

use crate::config::{Arg, MAX_QUEUE_CAPACITY};
use crate::error::ConfigError;
use crate::port::Micros;
use crate::queue::{EventBuffer, PrioritySlot, RingIndex};

// ---------------------------------------------------------------------------
// Task argument
// ---------------------------------------------------------------------------

/// Index of a task in its registry.
pub type TaskId = usize;

/// Payload carried through queues and handler invocations.
///
/// The two largest values are reserved for the scheduler itself; the usable
/// payload range is `[0, MAX - 2]`.
pub trait TaskArg: Copy + Eq + Debug + Send + 'static {
    const ZERO: Self;

    /// Delivered when a task's timer fires.
    const TIMEOUT_EVENT: Self;

    /// Delivered once at `init()` to tasks flagged run-on-init.
    const INIT_EVENT: Self;

    /// Largest value a producer may post.
    const MAX_PAYLOAD: Self;

    #[inline]
    fn is_sentinel(self) -> bool {
        self == Self::TIMEOUT_EVENT || self == Self::INIT_EVENT
    }
}

macro_rules! impl_task_arg {
    ($($ty:ty),*) => {
        $(
            impl TaskArg for $ty {
                const ZERO: Self = 0;
                const TIMEOUT_EVENT: Self = <$ty>::MAX;
                const INIT_EVENT: Self = <$ty>::MAX - 1;
                const MAX_PAYLOAD: Self = <$ty>::MAX - 2;
            }
        )*
    };
}

impl_task_arg!(u8, u16, u32);

/// Task handler. The return value is the flush directive: `true` discards
/// the rest of the sub-queue the event came from without handling it,
/// `false` keeps draining.
pub type Handler<A> = fn(A) -> bool;

// ---------------------------------------------------------------------------
// Descriptor (immutable, defined at build time)
// ---------------------------------------------------------------------------

/// What drives a task, with only the fields that kind needs.
#[derive(Clone, Copy)]
pub enum TaskKind<'a, A> {
    /// Runs once per posted event.
    Event {
        handler: Handler<A>,
        queue: &'a dyn EventBuffer<A>,
    },
    /// Runs once, `period` after being armed.
    TimedOneShot { handler: Handler<A>, period: Micros },
    /// Runs every `period`.
    TimedContinuous { handler: Handler<A>, period: Micros },
}

impl<A> TaskKind<'_, A> {
    pub fn handler(&self) -> Handler<A> {
        match *self {
            TaskKind::Event { handler, .. }
            | TaskKind::TimedOneShot { handler, .. }
            | TaskKind::TimedContinuous { handler, .. } => handler,
        }
    }

    /// Configured period; zero for event tasks.
    pub fn period(&self) -> Micros {
        match *self {
            TaskKind::Event { .. } => 0,
            TaskKind::TimedOneShot { period, .. } | TaskKind::TimedContinuous { period, .. } => {
                period
            }
        }
    }

    pub fn is_timed(&self) -> bool {
        !matches!(self, TaskKind::Event { .. })
    }
}

impl<A> Debug for TaskKind<'_, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TaskKind::Event { queue, .. } => f
                .debug_struct("Event")
                .field("capacity", &queue.capacity())
                .finish(),
            TaskKind::TimedOneShot { period, .. } => f
                .debug_struct("TimedOneShot")
                .field("period", period)
                .finish(),
            TaskKind::TimedContinuous { period, .. } => f
                .debug_struct("TimedContinuous")
                .field("period", period)
                .finish(),
        }
    }
}

/// Static description of one task.
#[derive(Debug, Clone, Copy)]
pub struct TaskDescriptor<'a, A> {
    pub kind: TaskKind<'a, A>,
    pub initially_enabled: bool,
    pub run_on_init: bool,
}

impl<'a, A: TaskArg> TaskDescriptor<'a, A> {
    pub const fn event(handler: Handler<A>, queue: &'a dyn EventBuffer<A>) -> Self {
        Self::with_kind(TaskKind::Event { handler, queue })
    }

    pub const fn one_shot(handler: Handler<A>, period: Micros) -> Self {
        Self::with_kind(TaskKind::TimedOneShot { handler, period })
    }

    pub const fn continuous(handler: Handler<A>, period: Micros) -> Self {
        Self::with_kind(TaskKind::TimedContinuous { handler, period })
    }

    /// Start the task disabled; it runs only after `enable()`.
    pub const fn disabled(mut self) -> Self {
        self.initially_enabled = false;
        self
    }

    /// Deliver `INIT_EVENT` to the task during `init()`.
    pub const fn run_on_init(mut self) -> Self {
        self.run_on_init = true;
        self
    }

    const fn with_kind(kind: TaskKind<'a, A>) -> Self {
        Self {
            kind,
            initially_enabled: true,
            run_on_init: false,
        }
    }
}

/// Check a registry for configuration errors. Called by `Scheduler::init`.
pub fn validate<A: TaskArg>(registry: &[TaskDescriptor<'_, A>]) -> Result<(), ConfigError> {
    for (task, descriptor) in registry.iter().enumerate() {
        match descriptor.kind {
            TaskKind::Event { queue, .. } => {
                let capacity = queue.capacity();
                if capacity == 0 {
                    return Err(ConfigError::EmptyQueue { task });
                }
                if capacity > MAX_QUEUE_CAPACITY {
                    return Err(ConfigError::QueueTooLarge {
                        task,
                        capacity,
                        max: MAX_QUEUE_CAPACITY,
                    });
                }
            }
            TaskKind::TimedOneShot { period, .. } | TaskKind::TimedContinuous { period, .. } => {
                if period == 0 {
                    return Err(ConfigError::ZeroPeriod { task });
                }
            }
        }
    }
    Ok(())
}

/// Descriptor for the crate-wide [`Arg`] width.
pub type DefaultTaskDescriptor<'a> = TaskDescriptor<'a, Arg>;

// ---------------------------------------------------------------------------
// Runtime state (mutable, owned by the scheduler)
// ---------------------------------------------------------------------------

/// Per-task timer. Timed tasks fire through it; event tasks can arm it with
/// `start_timer` to receive a one-shot `TIMEOUT_EVENT` in their priority
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub armed: bool,
    pub next_due: Micros,
    pub period: Micros,
}

impl Timer {
    pub const IDLE: Self = Self {
        armed: false,
        next_due: 0,
        period: 0,
    };

    /// Arm relative to `now`.
    pub fn arm(&mut self, now: Micros) {
        self.armed = true;
        self.next_due = now.saturating_add(self.period);
    }

    #[inline]
    pub fn expired(&self, now: Micros) -> bool {
        self.armed && now >= self.next_due
    }
}

/// Mutable state of one task.
#[derive(Debug, Clone, Copy)]
pub struct TaskControl<A> {
    pub enabled: bool,
    pub timer: Timer,
    /// Indices into the descriptor's `EventStorage`.
    pub queue: RingIndex,
    pub priority: PrioritySlot<A>,
}

impl<A: TaskArg> TaskControl<A> {
    pub const RESET: Self = Self {
        enabled: false,
        timer: Timer::IDLE,
        queue: RingIndex::EMPTY,
        priority: PrioritySlot::<A>::EMPTY,
    };

    /// Fresh state for `descriptor`, with timers armed relative to `now`.
    pub fn new(descriptor: &TaskDescriptor<'_, A>, now: Micros) -> Self {
        let mut control = Self::RESET;
        control.enabled = descriptor.initially_enabled;
        control.timer.period = descriptor.kind.period();
        if descriptor.kind.is_timed() && control.enabled {
            control.timer.arm(now);
        }
        control
    }

    /// Events waiting in both sub-queues.
    #[inline]
    pub fn pending(&self) -> usize {
        self.priority.len() + self.queue.len()
    }

    /// Whether a dispatch pass at `now` would invoke the handler.
    pub fn has_work(&self, now: Micros) -> bool {
        self.enabled
            && (!self.priority.is_empty() || !self.queue.is_empty() || self.timer.expired(now))
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
