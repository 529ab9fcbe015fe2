//! Error types returned by the scheduler API and by registry validation.

use thiserror::Error;

use crate::task::TaskId;

/// Runtime errors returned to callers of the scheduler API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The target queue (main queue or priority slot) has no room. The
    /// event was dropped; older queued events are unaffected.
    #[error("event queue full")]
    QueueFull,

    /// The task id is not in the registry.
    #[error("unknown task id {0}")]
    UnknownTask(TaskId),

    /// The operation needs an event queue but the task is timed.
    #[error("task {0} is not an event task")]
    NotEventTask(TaskId),
}

/// Registry misconfiguration detected by `validate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An event task was bound to storage with no slots.
    #[error("event task {task} has a zero-capacity queue")]
    EmptyQueue { task: TaskId },

    /// The storage is larger than `QueueIndex` can address.
    #[error("event task {task} queue capacity {capacity} exceeds {max}")]
    QueueTooLarge {
        task: TaskId,
        capacity: usize,
        max: usize,
    },

    /// A timed task would fire on every pass.
    #[error("timed task {task} has a zero period")]
    ZeroPeriod { task: TaskId },

    /// A tick task needs at least one tick between runs.
    #[error("tick task {task} has a zero tick period")]
    ZeroTickPeriod { task: usize },
}
