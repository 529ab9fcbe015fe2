//! # Event Queues
//!
//! Every event task owns two ring buffers:
//!
//! - a **main queue** whose storage is a statically allocated
//!   [`EventStorage`] referenced from the task descriptor, and whose
//!   indices live in the scheduler's runtime state;
//! - a **priority slot** of [`MAX_PRIORITY_EVENTS`] entries stored inline in
//!   the runtime state, for events that jump the FIFO.
//!
//! Both are filled by producers (interrupt handlers or other tasks) and
//! drained only by the dispatch loop. Index arithmetic is plain and
//! unsynchronized here; callers hold a critical section around every
//! push/pop together with the matching slot access.
//!
//! The overflow policy is reject-newest: a push into a full ring fails and
//! leaves the queued events untouched.

use core::cell::RefCell;

use crate::config::{Arg, QueueIndex, MAX_PRIORITY_EVENTS};
use crate::sync::{CriticalSection, Mutex};
use crate::task::TaskArg;

// ---------------------------------------------------------------------------
// Ring indices
// ---------------------------------------------------------------------------

/// Head/tail/count of a ring buffer whose slots live elsewhere.
///
/// `head` is the next slot to read, `tail` the next slot to write. The
/// capacity is passed on every call rather than stored, since it is a
/// property of the backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingIndex {
    head: QueueIndex,
    tail: QueueIndex,
    count: QueueIndex,
}

impl RingIndex {
    pub const EMPTY: Self = Self {
        head: 0,
        tail: 0,
        count: 0,
    };

    /// Reserve the tail slot. Returns the slot to write, or `None` if full.
    ///
    /// `capacity` must be non-zero and at most `QueueIndex::MAX`.
    pub fn push_slot(&mut self, capacity: usize) -> Option<usize> {
        if self.len() >= capacity {
            return None;
        }
        let slot = self.tail as usize;
        self.tail = ((slot + 1) % capacity) as QueueIndex;
        self.count += 1;
        Some(slot)
    }

    /// Release the head slot. Returns the slot to read, or `None` if empty.
    pub fn pop_slot(&mut self, capacity: usize) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let slot = self.head as usize;
        self.head = ((slot + 1) % capacity) as QueueIndex;
        self.count -= 1;
        Some(slot)
    }

    /// Forget every queued entry.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ---------------------------------------------------------------------------
// Priority slot
// ---------------------------------------------------------------------------

/// Small out-of-band FIFO serviced before a task's main queue.
#[derive(Debug, Clone, Copy)]
pub struct PrioritySlot<A> {
    events: [A; MAX_PRIORITY_EVENTS],
    index: RingIndex,
}

impl<A: TaskArg> PrioritySlot<A> {
    pub const EMPTY: Self = Self {
        events: [A::ZERO; MAX_PRIORITY_EVENTS],
        index: RingIndex::EMPTY,
    };

    /// Append an event. Hands it back if the slot is full.
    pub fn push(&mut self, event: A) -> Result<(), A> {
        match self.index.push_slot(MAX_PRIORITY_EVENTS) {
            Some(slot) => {
                self.events[slot] = event;
                Ok(())
            }
            None => Err(event),
        }
    }

    /// Take the oldest event, if any.
    pub fn pop(&mut self) -> Option<A> {
        self.index
            .pop_slot(MAX_PRIORITY_EVENTS)
            .map(|slot| self.events[slot])
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Main queue storage
// ---------------------------------------------------------------------------

/// Backing slots of an event task's main queue.
///
/// Object-safe so descriptors of different capacities fit in one registry.
/// Slot access requires a [`CriticalSection`] token.
pub trait EventBuffer<A>: Sync {
    /// Number of slots; the task's queue capacity.
    fn capacity(&self) -> usize;

    fn load(&self, cs: CriticalSection<'_>, slot: usize) -> A;

    fn store(&self, cs: CriticalSection<'_>, slot: usize, event: A);
}

/// Statically allocated storage for a queue of `C` events.
///
/// ```ignore
/// static UART_EVENTS: EventStorage<u16, 16> = EventStorage::new();
/// ```
pub struct EventStorage<A, const C: usize> {
    slots: Mutex<RefCell<[A; C]>>,
}

impl<A: TaskArg, const C: usize> EventStorage<A, C> {
    /// Empty storage. `const`, so it can initialize a `static`.
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([A::ZERO; C])),
        }
    }
}

impl<A: TaskArg, const C: usize> Default for EventStorage<A, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: TaskArg, const C: usize> EventBuffer<A> for EventStorage<A, C> {
    #[inline]
    fn capacity(&self) -> usize {
        C
    }

    #[inline]
    fn load(&self, cs: CriticalSection<'_>, slot: usize) -> A {
        self.slots.borrow_ref(cs)[slot]
    }

    #[inline]
    fn store(&self, cs: CriticalSection<'_>, slot: usize, event: A) {
        self.slots.borrow_ref_mut(cs)[slot] = event;
    }
}

/// Queue storage for the crate-wide [`Arg`] width.
pub type DefaultEventStorage<const C: usize> = EventStorage<Arg, C>;

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::critical_section;

    #[test]
    fn test_ring_wraps_around() {
        let mut ring = RingIndex::EMPTY;
        assert_eq!(ring.push_slot(3), Some(0));
        assert_eq!(ring.push_slot(3), Some(1));
        assert_eq!(ring.pop_slot(3), Some(0));
        assert_eq!(ring.push_slot(3), Some(2));
        assert_eq!(ring.push_slot(3), Some(0));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.push_slot(3), None);

        assert_eq!(ring.pop_slot(3), Some(1));
        assert_eq!(ring.pop_slot(3), Some(2));
        assert_eq!(ring.pop_slot(3), Some(0));
        assert_eq!(ring.pop_slot(3), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_clear_resets_indices() {
        let mut ring = RingIndex::EMPTY;
        ring.push_slot(4);
        ring.push_slot(4);
        ring.pop_slot(4);
        ring.clear();
        assert_eq!(ring, RingIndex::EMPTY);
        assert_eq!(ring.push_slot(4), Some(0));
    }

    #[test]
    fn test_full_capacity_queue() {
        let capacity = crate::config::MAX_QUEUE_CAPACITY;
        let mut ring = RingIndex::EMPTY;
        for expected in 0..capacity {
            assert_eq!(ring.push_slot(capacity), Some(expected));
        }
        assert_eq!(ring.len(), capacity);
        assert_eq!(ring.push_slot(capacity), None);
        assert_eq!(ring.pop_slot(capacity), Some(0));
        assert_eq!(ring.push_slot(capacity), Some(0));
    }

    #[test]
    fn test_priority_slot_rejects_newest() {
        let mut slot = PrioritySlot::<u8>::EMPTY;
        assert_eq!(slot.push(1), Ok(()));
        assert_eq!(slot.push(2), Ok(()));
        assert_eq!(slot.push(3), Err(3));
        assert_eq!(slot.pop(), Some(1));
        assert_eq!(slot.pop(), Some(2));
        assert_eq!(slot.pop(), None);
    }

    #[test]
    fn test_storage_slots() {
        let storage = EventStorage::<u32, 4>::new();
        assert_eq!(storage.capacity(), 4);
        critical_section(|cs| {
            storage.store(cs, 2, 0xABCD);
            assert_eq!(storage.load(cs, 2), 0xABCD);
            assert_eq!(storage.load(cs, 0), 0);
        });
    }
}
