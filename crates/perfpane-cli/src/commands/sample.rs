//! `perfpane sample`: one reading, printed without the overlay.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use clap::Args;
use perfpane_common::config::ProfilerConfig;
use perfpane_core::provider::ProviderSet;
use perfpane_core::sampler::CounterSampler;
use perfpane_tui::board::GaugeBoard;

use crate::{logging, output};

/// Arguments for the `sample` command.
#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Seconds between the two readings. Defaults to the refresh interval.
    #[arg(long)]
    pub interval: Option<f64>,

    /// Print the samples as JSON instead of gauges.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `sample` command.
///
/// Takes two snapshots `interval` apart and prints the resulting gauges,
/// followed by the absolute memory figures.
///
/// # Errors
///
/// Returns an error if a provider fails or stdout cannot be written.
pub fn execute(args: &SampleArgs, config: &ProfilerConfig) -> anyhow::Result<()> {
    logging::init_stderr();
    let interval = match args.interval {
        Some(secs) => {
            anyhow::ensure!(
                secs.is_finite() && secs > 0.0,
                "--interval must be positive, got {secs}"
            );
            Duration::from_secs_f64(secs)
        }
        None => config.refresh(),
    };

    let sampler = CounterSampler::new(ProviderSet::from_config(config));
    let prior = sampler.take_snapshot()?;
    thread::sleep(interval);
    let current = sampler.take_snapshot()?;
    let samples = CounterSampler::compute(&prior, &current);
    tracing::debug!(cells = samples.cell_count(), ?interval, "sample taken");

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &samples)?;
        writeln!(out)?;
        return Ok(());
    }

    let board = GaugeBoard::for_samples(&samples, config.rows, config.bar_width)?;
    for line in board.lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "{}", output::memory_summary(&current))?;
    Ok(())
}
