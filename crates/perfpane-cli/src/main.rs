//! # perfpane
//!
//! Live CPU, memory, and GPU gauges pinned above a program's scrolling
//! output.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod logging;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::execute(cli)
}
