//! End-to-end tests for the perfpane overlay.
//!
//! These drive the full pipeline with scripted providers and a recording
//! surface:
//! 1. Counter deltas to fractions to gauge text
//! 2. Output capture and draining
//! 3. Scheduler lifecycle: start, tick, drain, stop, teardown
//! 4. Failure handling: frozen gauges, resize relayout, fatal surface errors
//! 5. File-backed providers through the builder

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::cast_precision_loss
)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use perfpane_common::config::ProfilerConfig;
use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{CpuTimes, MemCounters, UtilizationSample};
use perfpane_core::provider::{MetricProvider, ProviderSet};
use perfpane_core::sampler::{CounterSampler, cpu_fraction, mem_fraction};
use perfpane_runtime::multiplexer::OutputMultiplexer;
use perfpane_runtime::profiler::ProfilerBuilder;
use perfpane_runtime::scheduler::{ScheduleState, Scheduler};
use perfpane_tui::bar::render_bar;
use perfpane_tui::board::GaugeBoard;
use perfpane_tui::surface::{RenderSurface, required_height};

// ── Fixtures ─────────────────────────────────────────────────────────

/// Replays a script of readings; `None` is a failed read. The last entry
/// repeats forever.
struct Scripted<T> {
    name: &'static str,
    script: Mutex<VecDeque<Option<T>>>,
}

impl<T: Clone + Send> Scripted<T> {
    fn new(name: &'static str, script: Vec<Option<T>>) -> Self {
        Self {
            name,
            script: Mutex::new(script.into()),
        }
    }
}

impl<T: Clone + Send> MetricProvider<T> for Scripted<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self) -> Result<T> {
        let mut script = self.script.lock().unwrap();
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        };
        next.ok_or_else(|| PerfpaneError::provider(self.name, "scripted failure"))
    }
}

fn cpu(fields: [u64; 8]) -> CpuTimes {
    CpuTimes::from_fields(&fields).expect("8 fields")
}

fn providers(cpu_script: Vec<Option<Vec<CpuTimes>>>, mem_script: Vec<Option<MemCounters>>) -> ProviderSet {
    ProviderSet {
        cpu: Box::new(Scripted::new("cpu", cpu_script)),
        memory: Box::new(Scripted::new("memory", mem_script)),
        gpu: None,
    }
}

fn ten_percent_cpu() -> Vec<Option<Vec<CpuTimes>>> {
    vec![
        Some(vec![cpu([0, 0, 0, 100, 0, 0, 0, 0])]),
        Some(vec![cpu([10, 0, 0, 190, 0, 0, 0, 0])]),
    ]
}

fn quarter_memory() -> Vec<Option<MemCounters>> {
    vec![Some(MemCounters {
        used: 2048,
        total: 8192,
    })]
}

#[derive(Debug, Default)]
struct Recording {
    initialized: usize,
    teardowns: usize,
    paints: Vec<Vec<String>>,
    output: String,
}

/// A surface that records every call and reports a settable height.
#[derive(Clone)]
struct RecordingSurface {
    log: Arc<Mutex<Recording>>,
    height: Arc<AtomicUsize>,
}

impl RecordingSurface {
    fn new(height: usize) -> Self {
        Self {
            log: Arc::default(),
            height: Arc::new(AtomicUsize::new(height)),
        }
    }

    fn resize(&self, height: usize) {
        self.height.store(height, Ordering::SeqCst);
    }

    fn paints(&self) -> usize {
        self.log.lock().unwrap().paints.len()
    }

    fn last_paint(&self) -> Vec<String> {
        self.log.lock().unwrap().paints.last().cloned().unwrap_or_default()
    }

    fn output(&self) -> String {
        self.log.lock().unwrap().output.clone()
    }

    fn teardowns(&self) -> usize {
        self.log.lock().unwrap().teardowns
    }
}

impl RenderSurface for RecordingSurface {
    fn initialize(&mut self) -> Result<()> {
        self.log.lock().unwrap().initialized += 1;
        Ok(())
    }

    fn max_gauge_rows(&mut self) -> Result<usize> {
        Ok(self
            .height
            .load(Ordering::SeqCst)
            .saturating_sub(required_height(0)))
    }

    fn paint(&mut self, board: &GaugeBoard) -> Result<()> {
        let height = self.height.load(Ordering::SeqCst);
        if height < required_height(board.rows()) {
            return Err(PerfpaneError::surface("too small"));
        }
        self.log.lock().unwrap().paints.push(board.lines());
        Ok(())
    }

    fn append_output(&mut self, text: &str) -> Result<()> {
        self.log.lock().unwrap().output.push_str(text);
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.log.lock().unwrap().teardowns += 1;
        Ok(())
    }
}

/// Stands in for stdout once the multiplexer is released.
#[derive(Clone, Default)]
struct Stdout(Arc<Mutex<Vec<u8>>>);

impl Stdout {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Stdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A surface whose second paint writes host output and then fails, and
/// whose teardown writes more host output.
struct WritesThenFails {
    mux: OutputMultiplexer,
    paints: usize,
}

impl RenderSurface for WritesThenFails {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn max_gauge_rows(&mut self) -> Result<usize> {
        Ok(10)
    }

    fn paint(&mut self, _board: &GaugeBoard) -> Result<()> {
        self.paints += 1;
        if self.paints < 2 {
            return Ok(());
        }
        self.mux.write("written before the failure\n");
        Err(PerfpaneError::surface("lost the terminal"))
    }

    fn append_output(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.mux.write("written during teardown\n");
        Ok(())
    }
}

/// A multiplexer whose released output is discarded.
fn quiet_mux(capacity: usize) -> OutputMultiplexer {
    OutputMultiplexer::with_sink(capacity, io::sink())
}

fn fast_config(rows: usize) -> ProfilerConfig {
    ProfilerConfig {
        refresh_secs: 0.05,
        drain_interval_ms: 10,
        rows,
        bar_width: 8,
        gpu: false,
        ..ProfilerConfig::default()
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ── Pipeline ─────────────────────────────────────────────────────────

#[test]
fn pipeline_cpu_delta_to_three_ticks() {
    let prior = [cpu([0, 0, 0, 100, 0, 0, 0, 0])];
    let current = [cpu([10, 0, 0, 190, 0, 0, 0, 0])];
    let UtilizationSample::Sequence(fractions) = cpu_fraction(&prior, &current) else {
        panic!("CPU utilization is a sequence");
    };
    assert!((fractions[0] - 0.10).abs() < 1e-9);

    let bar = render_bar(fractions[0], 30);
    assert_eq!(bar.chars().filter(|c| *c == '|').count(), 3);
}

#[test]
fn pipeline_memory_quarter() {
    let fraction = mem_fraction(&MemCounters {
        used: 2048,
        total: 8192,
    });
    assert!((fraction - 0.25).abs() < f64::EPSILON);
}

#[test]
fn pipeline_multiplexer_drain() {
    let mux = OutputMultiplexer::new(100);
    mux.write("a\n");
    mux.write("b\n");
    assert_eq!(mux.drain(), "a\nb\n");
    assert_eq!(mux.drain(), "");
}

#[test]
fn pipeline_sampler_to_board() {
    let mut sampler = CounterSampler::new(providers(ten_percent_cpu(), quarter_memory()));
    assert_eq!(sampler.prime(), 1);
    let samples = sampler.sample();
    let board = GaugeBoard::for_samples(&samples, 3, 30).expect("board");
    let lines = board.lines();
    assert_eq!(lines[0], format!("CPU0 [|||{}]", " ".repeat(27)));
    assert_eq!(lines[1], format!("DRAM [{}{}]", "|".repeat(7), " ".repeat(23)));
    assert!(lines[2].is_empty());
}

// ── Scheduler lifecycle ──────────────────────────────────────────────

#[test]
fn scheduler_paints_drains_and_tears_down_once() {
    let surface = RecordingSurface::new(20);
    let mux = quiet_mux(100);
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        mux.clone(),
        &fast_config(2),
    )
    .expect("start");

    mux.write("hello from the host\n");
    assert!(wait_until(Duration::from_secs(2), || surface
        .output()
        .contains("hello from the host")));
    assert!(wait_until(Duration::from_secs(2), || surface.paints() >= 3));
    assert!(scheduler.is_running());

    scheduler.stop().expect("stop");
    assert_eq!(scheduler.state(), ScheduleState::Stopped);
    assert_eq!(surface.teardowns(), 1);
    scheduler.stop().expect("second stop is a no-op");
    drop(scheduler);
    assert_eq!(surface.teardowns(), 1);
}

#[test]
fn scheduler_final_drain_is_written_after_teardown() {
    let surface = RecordingSurface::new(20);
    let stdout = Stdout::default();
    let mux = OutputMultiplexer::with_sink(100, stdout.clone());
    let mut config = fast_config(2);
    config.refresh_secs = 5.0;
    config.drain_interval_ms = 1000;
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        mux.clone(),
        &config,
    )
    .expect("start");

    mux.write("last words\n");
    scheduler.stop().expect("stop");
    assert!(!surface.output().contains("last words"));
    assert_eq!(stdout.text(), "last words\n");
    assert!(mux.is_released());

    mux.write("after the overlay\n");
    assert_eq!(stdout.text(), "last words\nafter the overlay\n");
}

#[test]
fn scheduler_stop_is_observed_within_one_refresh() {
    let surface = RecordingSurface::new(20);
    let mut config = fast_config(2);
    config.refresh_secs = 0.5;
    config.drain_interval_ms = 50;
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface,
        quiet_mux(10),
        &config,
    )
    .expect("start");

    thread::sleep(Duration::from_millis(120));
    let started = Instant::now();
    scheduler.stop().expect("stop");
    assert!(started.elapsed() < config.refresh());
    assert!(!scheduler.is_running());
}

#[test]
fn scheduler_drop_stops_the_worker() {
    let surface = RecordingSurface::new(20);
    {
        let _scheduler = Scheduler::start(
            CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
            surface.clone(),
            quiet_mux(10),
            &fast_config(2),
        )
        .expect("start");
    }
    assert_eq!(surface.teardowns(), 1);
}

// ── Failure handling ─────────────────────────────────────────────────

#[test]
fn provider_failure_freezes_gauge_at_last_value() {
    let surface = RecordingSurface::new(20);
    let mut memory = quarter_memory();
    memory.push(None);
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), memory)),
        surface.clone(),
        quiet_mux(10),
        &fast_config(2),
    )
    .expect("start");

    assert!(wait_until(Duration::from_secs(2), || surface.paints() >= 4));
    scheduler.stop().expect("stop");

    let lines = surface.last_paint();
    assert_eq!(lines, vec!["CPU0 [        ]", "DRAM [||      ]"]);
}

#[test]
fn shrinking_surface_recomputes_layout() {
    let surface = RecordingSurface::new(20);
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        quiet_mux(10),
        &fast_config(2),
    )
    .expect("start");
    assert_eq!(surface.last_paint().len(), 2);

    surface.resize(required_height(1));
    assert!(wait_until(Duration::from_secs(2), || surface.last_paint().len() == 1));
    assert_eq!(surface.last_paint(), vec!["CPU0 [        ]  DRAM [||      ]"]);
    assert!(scheduler.is_running());

    surface.resize(20);
    assert!(wait_until(Duration::from_secs(2), || surface.last_paint().len() == 2));
    scheduler.stop().expect("stop");
}

#[test]
fn surface_too_small_at_startup_is_fatal() {
    let surface = RecordingSurface::new(required_height(0));
    let mux = OutputMultiplexer::with_sink(10, Stdout::default());
    let err = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        mux.clone(),
        &fast_config(2),
    )
    .expect_err("terminal too small");
    assert!(matches!(err, PerfpaneError::RenderSurface { .. }));
    assert_eq!(surface.teardowns(), 1);
    assert!(mux.is_released());
}

#[test]
fn surface_lost_at_runtime_stops_and_releases_output() {
    let surface = RecordingSurface::new(20);
    let mux = quiet_mux(10);
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        mux.clone(),
        &fast_config(2),
    )
    .expect("start");

    surface.resize(2);
    assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));
    assert!(mux.is_released());
    assert_eq!(surface.teardowns(), 1);
    assert!(matches!(scheduler.stop(), Err(PerfpaneError::RenderSurface { .. })));
    assert_eq!(scheduler.state(), ScheduleState::Stopped);
}

#[test]
fn output_around_a_fatal_error_reaches_stdout_in_order() {
    let stdout = Stdout::default();
    let mux = OutputMultiplexer::with_sink(10, stdout.clone());
    let surface = WritesThenFails {
        mux: mux.clone(),
        paints: 0,
    };
    let mut scheduler = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface,
        mux.clone(),
        &fast_config(2),
    )
    .expect("start");

    assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));
    assert!(matches!(scheduler.stop(), Err(PerfpaneError::RenderSurface { .. })));
    assert_eq!(
        stdout.text(),
        "written before the failure\nwritten during teardown\n"
    );
}

#[test]
fn invalid_config_is_rejected_before_touching_the_surface() {
    let surface = RecordingSurface::new(20);
    let config = fast_config(0);
    let err = Scheduler::start(
        CounterSampler::new(providers(ten_percent_cpu(), quarter_memory())),
        surface.clone(),
        quiet_mux(10),
        &config,
    )
    .expect_err("zero rows");
    assert!(matches!(err, PerfpaneError::Config { .. }));
    assert_eq!(surface.log.lock().unwrap().initialized, 0);
}

// ── File-backed providers ────────────────────────────────────────────

#[test]
fn builder_runs_on_file_backed_providers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stat = dir.path().join("stat");
    let meminfo = dir.path().join("meminfo");
    std::fs::write(
        &stat,
        "cpu  20 0 0 200 0 0 0 0 0 0\ncpu0 10 0 0 100 0 0 0 0 0 0\ncpu1 10 0 0 100 0 0 0 0 0 0\n",
    )
    .expect("write stat");
    std::fs::write(&meminfo, "MemTotal: 8192 kB\nMemAvailable: 6144 kB\n").expect("write meminfo");

    let config = ProfilerConfig {
        proc_stat_path: stat,
        meminfo_path: meminfo,
        ..fast_config(3)
    };
    let surface = RecordingSurface::new(20);
    let mut profiler = ProfilerBuilder::new()
        .config(config)
        .output(quiet_mux(100))
        .start_on(surface.clone())
        .expect("start");

    profiler.output().write("host line\n");
    assert!(wait_until(Duration::from_secs(2), || surface.output().contains("host line")));
    let lines = surface.last_paint();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("CPU0"));
    assert!(lines[1].starts_with("CPU1"));
    assert_eq!(lines[2], "DRAM [||      ]");

    profiler.stop().expect("stop");
    assert_eq!(profiler.state(), ScheduleState::Stopped);
    assert!(profiler.output().is_released());
}
