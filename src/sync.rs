//! # Synchronization Primitives
//!
//! Interrupt-safe critical section abstractions. Every queue index and
//! enable flag shared between interrupt handlers and the dispatch loop is
//! accessed inside one of these sections.
//!
//! On Cortex-M the implementation comes from `cortex-m`'s
//! `critical-section-single-core` feature (interrupts masked for the
//! duration). Host builds link the `std` implementation of the
//! `critical-section` crate instead.

pub use critical_section::{CriticalSection, Mutex};

/// Execute a closure within a critical section.
///
/// Sections nest, so a handler running inside one (for instance a tick task
/// invoked from the timer interrupt) may still post events.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|cs| {
///     let control = CONTROL.borrow_ref_mut(cs);
///     // ...
/// });
/// ```
///
/// Keep sections as short as possible; they add directly to interrupt
/// latency.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    ::critical_section::with(f)
}
