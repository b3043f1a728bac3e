//! CLI command definitions and dispatch.

pub mod demo;
pub mod exec;
pub mod sample;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{Receiver, bounded};
use perfpane_common::config::ProfilerConfig;
use perfpane_common::types::TextEncoding;
use perfpane_runtime::multiplexer::OutputMultiplexer;
use perfpane_runtime::profiler::{Profiler, ProfilerBuilder};
use perfpane_tui::surface::terminal_rows;

use crate::logging;

/// Live resource gauges above a program's output.
#[derive(Parser, Debug)]
#[command(name = perfpane_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Overlay settings shared by every subcommand.
    #[command(flatten)]
    pub overlay: OverlayArgs,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print random words under the overlay.
    Demo(demo::DemoArgs),
    /// Run a program under the overlay.
    Exec(exec::ExecArgs),
    /// Take one reading and print the gauges.
    Sample(sample::SampleArgs),
}

/// Settings that override the configuration file.
#[derive(Args, Debug, Default)]
pub struct OverlayArgs {
    /// JSON configuration file.
    #[arg(long, global = true, env = "PERFPANE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds between gauge refreshes.
    #[arg(long, global = true)]
    pub refresh: Option<f64>,

    /// Gauge width in ticks.
    #[arg(long, global = true)]
    pub bar_width: Option<usize>,

    /// Rows in the gauge grid.
    #[arg(long, global = true)]
    pub rows: Option<usize>,

    /// Lines of output retained between redraws.
    #[arg(long, global = true)]
    pub scrollback: Option<usize>,

    /// Encoding of provider and program output (utf8, latin1, ascii).
    #[arg(long, global = true)]
    pub encoding: Option<TextEncoding>,

    /// Hide the GPU gauges.
    #[arg(long, global = true)]
    pub no_gpu: bool,
}

impl OverlayArgs {
    /// Loads the configuration file, if any, and applies the flags on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is
    /// invalid.
    pub fn load_config(&self) -> anyhow::Result<ProfilerConfig> {
        let mut config = match &self.config {
            Some(path) => ProfilerConfig::load(path)?,
            None => ProfilerConfig::default(),
        };
        if let Some(refresh) = self.refresh {
            config.refresh_secs = refresh;
        }
        if let Some(width) = self.bar_width {
            config.bar_width = width;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(capacity) = self.scrollback {
            config.scrollback_capacity = Some(capacity);
        }
        if let Some(encoding) = self.encoding {
            config.text_encoding = encoding;
        }
        if self.no_gpu {
            config.gpu = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Starts the overlay on the terminal, routing logs into its output.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the terminal cannot
/// host the overlay.
pub fn start_overlay(config: ProfilerConfig) -> anyhow::Result<Profiler> {
    let mux = OutputMultiplexer::new(config.scrollback_for(terminal_rows()));
    logging::init_overlay(&mux);
    let profiler = ProfilerBuilder::new().config(config).output(mux).start()?;
    Ok(profiler)
}

/// Installs a Ctrl+C handler that signals the returned channel.
///
/// # Errors
///
/// Returns an error if a handler is already installed.
pub fn ctrl_c_channel() -> anyhow::Result<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;
    Ok(rx)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.overlay.load_config()?;
    match cli.command {
        Command::Demo(args) => demo::execute(args, config),
        Command::Exec(args) => exec::execute(args, config),
        Command::Sample(args) => sample::execute(&args, &config),
    }
}
