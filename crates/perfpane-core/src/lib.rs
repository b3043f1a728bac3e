//! # perfpane-core
//!
//! Counter sampling for the perfpane overlay.
//!
//! - [`provider`]: raw counter sources for CPU, memory, and GPU.
//! - [`sampler`]: turns successive counter snapshots into utilization
//!   fractions, recovering locally from provider failures.
//! - [`command`]: deadline-bounded execution of external query tools.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod command;
pub mod provider;
pub mod sampler;
