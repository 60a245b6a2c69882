//! Production reliability features.
//!
//! This module provides graceful shutdown handling: stop accepting new
//! requests, let in-flight requests finish or be cut off by cancellation,
//! then release all open endpoint handles.

pub mod graceful_shutdown;

pub use graceful_shutdown::*;
