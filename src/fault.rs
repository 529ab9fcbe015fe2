//! # Fault Reporting
//!
//! Programmer and configuration errors are never silently ignored. They are
//! logged and, depending on severity and build profile, stop the device.
//!
//! Stopping means panicking: on target the `panic-halt` handler spins
//! forever, leaving the device hung where a debugger can inspect it. An
//! external watchdog, if fitted, turns that into a reset.

use log::error;
use thiserror::Error;

use crate::error::ConfigError;
use crate::task::TaskId;

/// An invariant violation detected by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("task id {id} out of range ({count} tasks registered)")]
    UnknownTask { id: TaskId, count: usize },

    #[error("task {0} has no event queue")]
    NotEventTask(TaskId),

    #[error("misconfigured registry: {0}")]
    Config(#[from] ConfigError),
}

/// Report a programmer error.
///
/// Fatal in debug builds. Release builds log it and carry on; the caller
/// turns the faulty request into a no-op.
pub fn report(fault: Fault) {
    error!("scheduler fault: {}", fault);
    if cfg!(debug_assertions) {
        panic!("scheduler fault: {}", fault);
    }
}

/// Report a fatal fault and never return.
pub fn halt(fault: Fault) -> ! {
    error!("fatal scheduler fault: {}", fault);
    panic!("fatal scheduler fault: {}", fault);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages() {
        let fault = Fault::UnknownTask { id: 7, count: 3 };
        assert_eq!(
            fault.to_string(),
            "task id 7 out of range (3 tasks registered)"
        );

        let fault = Fault::from(ConfigError::EmptyQueue { task: 2 });
        assert_eq!(
            fault.to_string(),
            "misconfigured registry: event task 2 has a zero-capacity queue"
        );
    }

    #[test]
    #[should_panic(expected = "fatal scheduler fault")]
    fn test_halt_panics() {
        halt(Fault::Config(ConfigError::ZeroPeriod { task: 0 }));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "scheduler fault")]
    fn test_report_is_fatal_in_debug() {
        report(Fault::NotEventTask(1));
    }
}
