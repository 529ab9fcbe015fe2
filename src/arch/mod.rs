//! # Architecture Abstraction Layer
//!
//! Target implementations of the [`port`](crate::port) seams. Currently the
//! Cortex-M4 port; other targets go in sibling modules.

#[cfg(feature = "cortex-m4")]
pub mod cortex_m4;
