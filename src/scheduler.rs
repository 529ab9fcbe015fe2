//! # Scheduler
//!
//! Cooperative dispatch of event-driven and timed tasks on a single thread
//! of execution.
//!
//! ## Dispatch pass
//!
//! `run_once()` visits every task in registry order:
//! 1. **Disabled** tasks are skipped; their queues keep filling.
//! 2. **Event** tasks drain their priority slot, then their main queue, one
//!    handler call per event. A handler returning `true` flushes the rest
//!    of the sub-queue it was fed from.
//! 3. **Timed** tasks whose `next_due` has passed run once with
//!    `TIMEOUT_EVENT`. Continuous tasks advance `next_due` by exactly one
//!    period; one-shot tasks disable themselves.
//!
//! Each sub-queue is drained at most by the number of events it held when
//! the task's turn started. Events posted during the pass wait for the next
//! one, so a handler that posts to itself cannot starve the tasks after it.
//!
//! ## Concurrency
//!
//! Producers (interrupt handlers and other tasks) call `post` and
//! `post_priority` from any context. Every access to the runtime state
//! happens inside a critical section, and handlers always run outside of
//! one, so a handler may post, enable, disable or flush freely.

use core::cell::RefCell;

use log::{debug, info, trace, warn};

use crate::config::Arg;
use crate::error::Error;
use crate::fault::{self, Fault};
use crate::port::{Micros, Sleep, Timebase};
use crate::queue::EventBuffer;
use crate::sync::{critical_section, Mutex};
use crate::task::{self, Handler, TaskArg, TaskControl, TaskDescriptor, TaskId, TaskKind};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The task manager: an immutable registry plus the runtime state of each
/// task, indexed by [`TaskId`].
///
/// `new` is a `const fn`, so the usual deployment is a single `static`
/// instance shared by the main loop and interrupt handlers:
///
/// ```ignore
/// static SCHEDULER: Scheduler<'static, u16, SysTickClock, 3> =
///     Scheduler::new(&TASKS, SysTickClock);
/// ```
pub struct Scheduler<'a, A: TaskArg, T, const N: usize> {
    registry: &'a [TaskDescriptor<'a, A>; N],
    control: Mutex<RefCell<[TaskControl<A>; N]>>,
    clock: T,
}

impl<'a, A: TaskArg, T: Timebase, const N: usize> Scheduler<'a, A, T, N> {
    /// Create a scheduler over `registry`. All tasks stay inert until
    /// [`init`](Self::init).
    pub const fn new(registry: &'a [TaskDescriptor<'a, A>; N], clock: T) -> Self {
        Self {
            registry,
            control: Mutex::new(RefCell::new([TaskControl::<A>::RESET; N])),
            clock,
        }
    }

    /// Build the runtime state and deliver `INIT_EVENT` to run-on-init
    /// tasks, in registry order.
    ///
    /// A misconfigured registry is fatal.
    pub fn init(&self) {
        if let Err(err) = task::validate(self.registry) {
            fault::halt(Fault::Config(err));
        }

        let now = self.clock.now();
        critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            for (state, descriptor) in control.iter_mut().zip(self.registry) {
                *state = TaskControl::new(descriptor, now);
            }
        });
        info!("scheduler: {} tasks initialized at {}us", N, now);

        for (id, descriptor) in self.registry.iter().enumerate() {
            if descriptor.run_on_init {
                trace!("scheduler: task {} init event", id);
                // No queue is involved, so the flush directive is moot.
                let _ = (descriptor.kind.handler())(A::INIT_EVENT);
            }
        }
    }

    /// Run one dispatch pass over all tasks.
    ///
    /// Returns `true` if at least one handler ran; `false` means the pass
    /// found nothing to do and the caller may sleep.
    pub fn run_once(&self) -> bool {
        let mut worked = false;
        for (id, descriptor) in self.registry.iter().enumerate() {
            worked |= match descriptor.kind {
                TaskKind::Event { handler, queue } => self.service_event(id, handler, queue),
                TaskKind::TimedOneShot { handler, .. } => self.service_timed(id, handler, true),
                TaskKind::TimedContinuous { handler, .. } => {
                    self.service_timed(id, handler, false)
                }
            };
        }
        worked
    }

    /// The idle loop: dispatch forever, sleeping whenever a pass finds no
    /// work.
    pub fn run<S: Sleep>(&self, sleep: &S) -> ! {
        loop {
            if !self.run_once() {
                sleep.sleep_until_interrupt(|| self.has_pending_work());
            }
        }
    }

    fn service_event(&self, id: TaskId, handler: Handler<A>, queue: &dyn EventBuffer<A>) -> bool {
        let now = self.clock.now();
        let backlog = critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            let task = &mut control[id];
            if !task.enabled {
                return None;
            }
            if task.timer.expired(now) {
                task.timer.armed = false;
                if task.priority.push(A::TIMEOUT_EVENT).is_err() {
                    warn!("scheduler: task {} priority slot full, timeout lost", id);
                }
            }
            Some((task.priority.len(), task.queue.len()))
        });
        let Some((priority_backlog, queue_backlog)) = backlog else {
            return false;
        };

        let mut invoked = false;

        for _ in 0..priority_backlog {
            let event = critical_section(|cs| {
                let mut control = self.control.borrow_ref_mut(cs);
                let task = &mut control[id];
                if task.enabled {
                    task.priority.pop()
                } else {
                    None
                }
            });
            let Some(event) = event else { break };
            invoked = true;
            if handler(event) {
                critical_section(|cs| self.control.borrow_ref_mut(cs)[id].priority.clear());
                trace!("scheduler: task {} flushed priority events", id);
                break;
            }
        }

        let capacity = queue.capacity();
        for _ in 0..queue_backlog {
            let event = critical_section(|cs| {
                let mut control = self.control.borrow_ref_mut(cs);
                let task = &mut control[id];
                if !task.enabled {
                    return None;
                }
                task.queue
                    .pop_slot(capacity)
                    .map(|slot| queue.load(cs, slot))
            });
            let Some(event) = event else { break };
            invoked = true;
            if handler(event) {
                critical_section(|cs| self.control.borrow_ref_mut(cs)[id].queue.clear());
                trace!("scheduler: task {} flushed queued events", id);
                break;
            }
        }

        invoked
    }

    fn service_timed(&self, id: TaskId, handler: Handler<A>, one_shot: bool) -> bool {
        let now = self.clock.now();
        let fired = critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            let task = &mut control[id];
            if !task.enabled || !task.timer.expired(now) {
                return false;
            }
            if one_shot {
                task.enabled = false;
                task.timer.armed = false;
            } else {
                // Relative to the previous deadline, not to `now`: loop
                // jitter must not accumulate into drift.
                task.timer.next_due = task.timer.next_due.saturating_add(task.timer.period);
            }
            true
        });
        if fired {
            let _ = handler(A::TIMEOUT_EVENT);
        }
        fired
    }

    // -----------------------------------------------------------------------
    // Producer API (callable from interrupt context)
    // -----------------------------------------------------------------------

    /// Append `event` to the task's main queue.
    ///
    /// Fails with [`Error::QueueFull`] when there is no room; the new event
    /// is dropped and queued ones are untouched. Callers that cannot afford
    /// to lose it must retry or escalate.
    pub fn post(&self, id: TaskId, event: A) -> Result<(), Error> {
        debug_assert!(!event.is_sentinel(), "posted a reserved event value");
        let queue = self.event_queue(id)?;
        let capacity = queue.capacity();
        critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            match control[id].queue.push_slot(capacity) {
                Some(slot) => {
                    queue.store(cs, slot, event);
                    Ok(())
                }
                None => Err(Error::QueueFull),
            }
        })
        .inspect_err(|_| warn!("scheduler: task {} queue full, event dropped", id))
    }

    /// Append `event` to the task's priority slot, ahead of its main queue.
    pub fn post_priority(&self, id: TaskId, event: A) -> Result<(), Error> {
        debug_assert!(!event.is_sentinel(), "posted a reserved event value");
        self.event_queue(id)?;
        critical_section(|cs| {
            self.control.borrow_ref_mut(cs)[id]
                .priority
                .push(event)
                .map_err(|_| Error::QueueFull)
        })
        .inspect_err(|_| warn!("scheduler: task {} priority slot full, event dropped", id))
    }

    // -----------------------------------------------------------------------
    // Control API
    // -----------------------------------------------------------------------

    /// Let the task run. Enabling a disabled timed task re-arms it at
    /// `now + period`; enabling an enabled task changes nothing.
    pub fn enable(&self, id: TaskId) -> Result<(), Error> {
        let timed = self.descriptor(id)?.kind.is_timed();
        let now = self.clock.now();
        critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            let task = &mut control[id];
            if !task.enabled {
                task.enabled = true;
                if timed {
                    task.timer.arm(now);
                }
            }
        });
        debug!("scheduler: task {} enabled", id);
        Ok(())
    }

    /// Stop the task from running.
    ///
    /// Its queue is kept: events keep arriving and are drained once the task
    /// is enabled again. A busy producer can fill the queue meanwhile, after
    /// which its posts fail with [`Error::QueueFull`].
    pub fn disable(&self, id: TaskId) -> Result<(), Error> {
        self.descriptor(id)?;
        critical_section(|cs| self.control.borrow_ref_mut(cs)[id].enabled = false);
        debug!("scheduler: task {} disabled", id);
        Ok(())
    }

    /// Discard every queued event of an event task, priority slot included.
    pub fn flush_events(&self, id: TaskId) -> Result<(), Error> {
        self.event_queue(id)?;
        critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            let task = &mut control[id];
            task.queue.clear();
            task.priority.clear();
        });
        trace!("scheduler: task {} events flushed", id);
        Ok(())
    }

    /// Arm the task's timer to expire at `now + period`, replacing the
    /// period when one is given.
    ///
    /// For timed tasks this restarts their schedule. An event task receives
    /// a single `TIMEOUT_EVENT` through its priority slot when the timer
    /// expires. The enabled flag is left alone.
    ///
    /// A zero delay never fires: if the task ends up with no period (an
    /// event task that was never given one), the timer is left disarmed.
    ///
    /// # Returns
    /// `Err(UnknownTask)` for an id outside the registry.
    pub fn start_timer(&self, id: TaskId, period: Option<Micros>) -> Result<(), Error> {
        self.descriptor(id)?;
        let now = self.clock.now();
        let armed = critical_section(|cs| {
            let mut control = self.control.borrow_ref_mut(cs);
            let timer = &mut control[id].timer;
            if let Some(period) = period.filter(|p| *p != 0) {
                timer.period = period;
            }
            if timer.period == 0 {
                timer.armed = false;
            } else {
                timer.arm(now);
            }
            timer.armed
        });
        if armed {
            debug!("scheduler: task {} timer started", id);
        } else {
            debug!("scheduler: task {} has no timer period, timer left stopped", id);
        }
        Ok(())
    }

    /// Disarm the task's timer.
    pub fn stop_timer(&self, id: TaskId) -> Result<(), Error> {
        self.descriptor(id)?;
        critical_section(|cs| self.control.borrow_ref_mut(cs)[id].timer.armed = false);
        debug!("scheduler: task {} timer stopped", id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Whether the task currently takes part in dispatch passes.
    ///
    /// # Returns
    /// The enabled flag, or `Err(UnknownTask)` for an id outside the
    /// registry.
    pub fn is_enabled(&self, id: TaskId) -> Result<bool, Error> {
        self.descriptor(id)?;
        Ok(critical_section(|cs| {
            self.control.borrow_ref(cs)[id].enabled
        }))
    }

    /// Events waiting for the task, priority slot included.
    pub fn pending_events(&self, id: TaskId) -> Result<usize, Error> {
        self.descriptor(id)?;
        Ok(critical_section(|cs| {
            self.control.borrow_ref(cs)[id].pending()
        }))
    }

    /// Deadline of the task's armed timer.
    pub fn next_due(&self, id: TaskId) -> Result<Option<Micros>, Error> {
        self.descriptor(id)?;
        Ok(critical_section(|cs| {
            let timer = self.control.borrow_ref(cs)[id].timer;
            timer.armed.then_some(timer.next_due)
        }))
    }

    /// Whether a dispatch pass right now would run any handler.
    pub fn has_pending_work(&self) -> bool {
        let now = self.clock.now();
        critical_section(|cs| {
            self.control
                .borrow_ref(cs)
                .iter()
                .any(|task| task.has_work(now))
        })
    }

    /// Current time as seen by the dispatch loop.
    pub fn now(&self) -> Micros {
        self.clock.now()
    }

    /// The descriptor table the scheduler was built over.
    pub fn registry(&self) -> &'a [TaskDescriptor<'a, A>; N] {
        self.registry
    }

    fn descriptor(&self, id: TaskId) -> Result<&'a TaskDescriptor<'a, A>, Error> {
        let registry = self.registry;
        registry.get(id).ok_or_else(|| {
            fault::report(Fault::UnknownTask { id, count: N });
            Error::UnknownTask(id)
        })
    }

    fn event_queue(&self, id: TaskId) -> Result<&'a dyn EventBuffer<A>, Error> {
        match self.descriptor(id)?.kind {
            TaskKind::Event { queue, .. } => Ok(queue),
            _ => {
                fault::report(Fault::NotEventTask(id));
                Err(Error::NotEventTask(id))
            }
        }
    }
}

/// Scheduler carrying the crate-wide [`Arg`] width selected by the
/// `task-arg-8` / `task-arg-32` features.
pub type DefaultScheduler<'a, T, const N: usize> = Scheduler<'a, Arg, T, N>;

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
