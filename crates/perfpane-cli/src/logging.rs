//! Log subscriber setup.
//!
//! `RUST_LOG` selects the filter (default `warn`). While the overlay runs,
//! log lines go into the captured output so they scroll below the gauges.
//! Once the overlay has released its output they go to stderr, away from the
//! host's own stdout.

use std::io::{self, Stderr};

use perfpane_runtime::multiplexer::{MuxWriter, OutputMultiplexer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::EitherWriter;

const DEFAULT_FILTER: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Logs to stderr.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(io::stderr)
        .try_init();
}

/// Logs into `mux`, without ANSI colours, until it is released.
pub fn init_overlay(mux: &OutputMultiplexer) {
    let mux = mux.clone();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_ansi(false)
        .with_writer(move || overlay_writer(&mux))
        .try_init();
}

fn overlay_writer(mux: &OutputMultiplexer) -> EitherWriter<MuxWriter, Stderr> {
    if mux.is_released() {
        EitherWriter::B(io::stderr())
    } else {
        EitherWriter::A(mux.writer())
    }
}
