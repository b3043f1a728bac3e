//! # perfpane-tui
//!
//! Gauge rendering for the perfpane overlay, built with `ratatui` and
//! `crossterm`:
//! - [`bar`]: fixed-width text gauges for fractions and scalars.
//! - [`layout`]: row-major assignment of metrics to grid cells.
//! - [`board`]: the gauge grid that is filled in place every tick.
//! - [`surface`]: the terminal split into a gauge box and a scrollback box.
//! - [`ui`]: frame composition for the surface.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod bar;
pub mod board;
pub mod layout;
pub mod surface;
pub mod ui;
