//! Fluent API for starting the overlay.

use perfpane_common::config::ProfilerConfig;
use perfpane_common::error::Result;
use perfpane_core::provider::ProviderSet;
use perfpane_core::sampler::CounterSampler;
use perfpane_tui::surface::{RenderSurface, TerminalSurface, terminal_rows};

use crate::multiplexer::OutputMultiplexer;
use crate::scheduler::{ScheduleState, Scheduler};

/// Builder for configuring the overlay before it starts.
#[derive(Debug, Default)]
pub struct ProfilerBuilder {
    config: ProfilerConfig,
    providers: Option<ProviderSet>,
    mux: Option<OutputMultiplexer>,
}

impl ProfilerBuilder {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sampling interval in seconds.
    #[must_use]
    pub const fn refresh_secs(mut self, secs: f64) -> Self {
        self.config.refresh_secs = secs;
        self
    }

    /// Sets the gauge grid's row count.
    #[must_use]
    pub const fn rows(mut self, rows: usize) -> Self {
        self.config.rows = rows;
        self
    }

    /// Sets the gauge width in ticks.
    #[must_use]
    pub const fn bar_width(mut self, width: usize) -> Self {
        self.config.bar_width = width;
        self
    }

    /// Uses `providers` instead of the host providers from the config.
    #[must_use]
    pub fn providers(mut self, providers: ProviderSet) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Captures into an existing multiplexer, e.g. one a log subscriber
    /// already writes to.
    #[must_use]
    pub fn output(mut self, mux: OutputMultiplexer) -> Self {
        self.mux = Some(mux);
        self
    }

    /// Starts the overlay on the process's terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the terminal
    /// cannot host the overlay.
    pub fn start(self) -> Result<Profiler> {
        let capacity = self.config.scrollback_for(terminal_rows());
        let surface = TerminalSurface::stdout()?.with_scrollback(capacity);
        self.start_on(surface)
    }

    /// Starts the overlay on `surface`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the surface
    /// cannot host the overlay.
    pub fn start_on<S: RenderSurface + 'static>(self, surface: S) -> Result<Profiler> {
        self.config.validate()?;
        let mux = self
            .mux
            .unwrap_or_else(|| OutputMultiplexer::new(self.config.scrollback_for(terminal_rows())));
        let providers = self
            .providers
            .unwrap_or_else(|| ProviderSet::from_config(&self.config));
        let scheduler = Scheduler::start(
            CounterSampler::new(providers),
            surface,
            mux.clone(),
            &self.config,
        )?;
        Ok(Profiler { scheduler, mux })
    }
}

/// A running overlay. Dropping it stops the overlay.
#[derive(Debug)]
pub struct Profiler {
    scheduler: Scheduler,
    mux: OutputMultiplexer,
}

impl Profiler {
    /// Handle for host output.
    #[must_use]
    pub fn output(&self) -> OutputMultiplexer {
        self.mux.clone()
    }

    /// Current scheduler state.
    #[must_use]
    pub fn state(&self) -> ScheduleState {
        self.scheduler.state()
    }

    /// Whether the render loop is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stops the render loop and returns host output to stdout.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the render loop, if any.
    pub fn stop(&mut self) -> Result<()> {
        let result = self.scheduler.stop();
        self.mux.release();
        result
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "overlay ended with an error");
        }
    }
}
