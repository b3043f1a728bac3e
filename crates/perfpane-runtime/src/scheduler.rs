//! The background sample/render loop.
//!
//! One named worker thread owns the sampler, the gauge board, and the render
//! surface. It wakes every drain interval to move captured output into the
//! scrolling region, and every refresh to sample and repaint the gauges. The
//! stop channel doubles as the tick timer. When the worker exits it tears the
//! surface down and releases the multiplexer, so output still pending then
//! and everything written afterwards goes to stdout.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};

use perfpane_common::config::ProfilerConfig;
use perfpane_common::constants::WORKER_THREAD_NAME;
use perfpane_common::error::{PerfpaneError, Result};
use perfpane_core::sampler::CounterSampler;
use perfpane_tui::board::GaugeBoard;
use perfpane_tui::surface::RenderSurface;

use crate::multiplexer::OutputMultiplexer;

/// Where the worker is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    /// Waiting for the next tick or drain.
    Idle,
    /// Reading providers.
    Sampling,
    /// Updating the board and painting.
    Rendering,
    /// The worker has exited and the surface is torn down.
    Stopped,
}

type SharedState = Arc<Mutex<ScheduleState>>;

fn set_state(state: &SharedState, next: ScheduleState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// Handle to the running worker.
#[derive(Debug)]
pub struct Scheduler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Result<()>>>,
    state: SharedState,
}

impl Scheduler {
    /// Initializes `surface`, paints the first frame, and spawns the worker.
    ///
    /// Everything up to the spawn runs on the calling thread, so a terminal
    /// that is too small fails here instead of in the background.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the surface cannot be
    /// initialized or cannot fit a single gauge row,
    /// [`PerfpaneError::Config`] for an unusable configuration, and
    /// [`PerfpaneError::Io`] if the thread cannot be spawned.
    pub fn start<S>(
        mut sampler: CounterSampler,
        mut surface: S,
        mux: OutputMultiplexer,
        config: &ProfilerConfig,
    ) -> Result<Self>
    where
        S: RenderSurface + 'static,
    {
        config.validate()?;
        let cores = sampler.prime();

        surface.initialize()?;
        let board = match first_frame(&mut sampler, &mut surface, config) {
            Ok(board) => board,
            Err(e) => {
                let _ = surface.teardown();
                mux.release();
                return Err(e);
            }
        };

        let (stop_tx, stop_rx) = bounded(1);
        let state: SharedState = Arc::new(Mutex::new(ScheduleState::Idle));
        let worker = Worker {
            sampler,
            surface,
            mux,
            board,
            rows: config.rows,
            refresh: config.refresh(),
            drain_interval: config.drain_interval(),
            state: Arc::clone(&state),
        };

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run(&stop_rx))
            .map_err(|e| PerfpaneError::Io {
                path: WORKER_THREAD_NAME.into(),
                source: e,
            })?;

        tracing::info!(
            cores,
            rows = config.rows,
            refresh = ?config.refresh(),
            drain = ?config.drain_interval(),
            "scheduler started"
        );
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            state,
        })
    }

    /// Current worker state.
    #[must_use]
    pub fn state(&self) -> ScheduleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the worker thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the worker to stop and joins it.
    ///
    /// Idempotent: later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that ended the worker, if any.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let result = handle
            .join()
            .unwrap_or_else(|_| Err(PerfpaneError::surface("render worker panicked")));
        set_state(&self.state, ScheduleState::Stopped);
        tracing::info!(ok = result.is_ok(), "scheduler stopped");
        result
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "scheduler ended with an error");
        }
    }
}

fn first_frame<S: RenderSurface>(
    sampler: &mut CounterSampler,
    surface: &mut S,
    config: &ProfilerConfig,
) -> Result<GaugeBoard> {
    let fit = surface.max_gauge_rows()?;
    if fit == 0 {
        return Err(PerfpaneError::surface("terminal too small for a single gauge row"));
    }
    let samples = sampler.sample();
    let mut board = GaugeBoard::for_samples(&samples, config.rows, config.bar_width)?;
    if fit < config.rows {
        tracing::warn!(configured = config.rows, fit, "terminal too short, fewer gauge rows");
        board.relayout(fit)?;
    }
    surface.paint(&board)?;
    Ok(board)
}

struct Worker<S> {
    sampler: CounterSampler,
    surface: S,
    mux: OutputMultiplexer,
    board: GaugeBoard,
    rows: usize,
    refresh: Duration,
    drain_interval: Duration,
    state: SharedState,
}

impl<S: RenderSurface> Worker<S> {
    fn run(mut self, stop_rx: &Receiver<()>) -> Result<()> {
        let result = self.cycle(stop_rx);
        let outcome = match result {
            Err(PerfpaneError::CancellationRequested) => Ok(()),
            other => other,
        };

        // The last drain would be painted onto a screen that is about to
        // go away, so it is written out after teardown instead, ahead of
        // anything the host writes meanwhile.
        let pending = self.mux.drain();
        let torn = self.surface.teardown();
        set_state(&self.state, ScheduleState::Stopped);

        if let Err(e) = &outcome {
            tracing::error!(error = %e, "render loop failed, releasing output");
        }
        self.mux.release_with(&pending);
        outcome.and(torn)
    }

    fn cycle(&mut self, stop_rx: &Receiver<()>) -> Result<()> {
        let mut next_tick = Instant::now() + self.refresh;
        loop {
            match stop_rx.recv_timeout(self.drain_interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(PerfpaneError::CancellationRequested);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            let output = self.mux.drain();
            if !output.is_empty() {
                self.surface.append_output(&output)?;
            }

            let now = Instant::now();
            if now < next_tick {
                continue;
            }
            next_tick = now + self.refresh;
            match self.tick() {
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "tick skipped");
                    set_state(&self.state, ScheduleState::Idle);
                }
                other => other?,
            }
        }
    }

    fn tick(&mut self) -> Result<()> {
        set_state(&self.state, ScheduleState::Sampling);
        let samples = self.sampler.sample();

        set_state(&self.state, ScheduleState::Rendering);
        let _ = self.board.update(&samples)?;
        self.fit_rows()?;
        self.surface.paint(&self.board)?;
        tracing::debug!(cells = samples.cell_count(), "tick rendered");

        set_state(&self.state, ScheduleState::Idle);
        Ok(())
    }

    /// Shrinks the grid to what the surface still fits, or grows it back
    /// toward the configured rows.
    fn fit_rows(&mut self) -> Result<()> {
        let fit = self.surface.max_gauge_rows()?;
        if fit == 0 {
            return Err(PerfpaneError::surface("terminal too small for a single gauge row"));
        }
        let rows = self.rows.min(fit);
        if rows != self.board.rows() {
            tracing::info!(from = self.board.rows(), to = rows, "surface resized, recomputing layout");
            self.board.relayout(rows)?;
        }
        Ok(())
    }
}
