//! # perfpane-runtime
//!
//! Runs the overlay next to a host program:
//! - [`multiplexer`]: captures host output into a bounded scrollback.
//! - [`scheduler`]: the worker thread that samples, renders, and drains.
//! - [`profiler`]: a builder-style entry point wiring the two together.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod multiplexer;
pub mod profiler;
pub mod scheduler;
