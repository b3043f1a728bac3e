//! Delta-based utilization computation.
//!
//! CPU utilization comes from the difference between two counter snapshots,
//! always computed as `current - prior`. Memory and GPU readings need only
//! the current snapshot. Every fraction produced here is in `[0, 1]`.

use perfpane_common::constants::{
    CPU_LABEL, GPU_MEM_LABEL, GPU_TEMP_LABEL, GPU_UTIL_LABEL, MEM_LABEL,
};
use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{
    CpuTimes, GpuCounters, MemCounters, Metric, MetricSnapshot, SampleSet, UtilizationSample,
    clamp_fraction,
};

use crate::provider::ProviderSet;

/// Derived GPU values for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpuReadings {
    /// Temperature, passed through as a scalar.
    pub temperature: f64,
    /// Framebuffer memory in use, as a fraction.
    pub memory: f64,
    /// Utilization, as a fraction.
    pub utilization: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    clamp_fraction(numerator as f64 / denominator as f64)
}

/// Busy fraction of one core between two readings.
///
/// # Errors
///
/// Returns [`PerfpaneError::DegenerateDelta`] when no counter advanced, so
/// the caller can decide what to show instead.
pub fn try_core_fraction(core: usize, prior: &CpuTimes, current: &CpuTimes) -> Result<f64> {
    let delta = current.saturating_delta(prior);
    let total = delta.total();
    if total == 0 {
        return Err(PerfpaneError::DegenerateDelta { core });
    }
    let busy = total.saturating_sub(delta.idle_total());
    Ok(ratio(busy, total))
}

/// Busy fraction of one core, `0` when no counter advanced.
#[must_use]
pub fn core_fraction(prior: &CpuTimes, current: &CpuTimes) -> f64 {
    try_core_fraction(0, prior, current).unwrap_or(0.0)
}

fn core_fractions(prior: &[CpuTimes], current: &[CpuTimes]) -> Vec<f64> {
    current
        .iter()
        .enumerate()
        .map(|(core, now)| prior.get(core).map_or(0.0, |before| core_fraction(before, now)))
        .collect()
}

/// Per-core busy fractions between two snapshots.
///
/// Cores missing from `prior` (hot-plugged since) read as `0`.
#[must_use]
pub fn cpu_fraction(prior: &[CpuTimes], current: &[CpuTimes]) -> UtilizationSample {
    UtilizationSample::sequence(core_fractions(prior, current))
}

/// Fraction of host memory in use.
#[must_use]
pub fn mem_fraction(counters: &MemCounters) -> f64 {
    ratio(counters.used, counters.total)
}

/// Converts a GPU reading into a temperature scalar and two fractions.
#[must_use]
pub fn gpu_readings(counters: &GpuCounters) -> GpuReadings {
    GpuReadings {
        temperature: counters.temperature,
        memory: ratio(counters.memory_used, counters.memory_total),
        utilization: clamp_fraction(counters.utilization_pct / 100.0),
    }
}

/// Arranges one tick's values in display order.
fn assemble(cpu: Vec<f64>, gpu: Option<GpuReadings>, memory: f64) -> SampleSet {
    let mut metrics = vec![Metric::new(CPU_LABEL, UtilizationSample::sequence(cpu))];
    if let Some(gpu) = gpu {
        metrics.push(Metric::new(GPU_UTIL_LABEL, UtilizationSample::fraction(gpu.utilization)));
        metrics.push(Metric::new(GPU_MEM_LABEL, UtilizationSample::fraction(gpu.memory)));
        metrics.push(Metric::new(GPU_TEMP_LABEL, UtilizationSample::Scalar(gpu.temperature)));
    }
    metrics.push(Metric::new(MEM_LABEL, UtilizationSample::fraction(memory)));
    SampleSet { metrics }
}

/// Queries providers each tick and keeps just enough state to compute the
/// next CPU delta and to stand in for a failed provider.
#[derive(Debug)]
pub struct CounterSampler {
    providers: ProviderSet,
    prior_cpu: Option<Vec<CpuTimes>>,
    last_cpu: Vec<f64>,
    last_memory: f64,
    last_gpu: GpuReadings,
    core_count: usize,
}

impl CounterSampler {
    /// Creates a sampler over `providers`.
    #[must_use]
    pub const fn new(providers: ProviderSet) -> Self {
        Self {
            providers,
            prior_cpu: None,
            last_cpu: Vec::new(),
            last_memory: 0.0,
            last_gpu: GpuReadings {
                temperature: 0.0,
                memory: 0.0,
                utilization: 0.0,
            },
            core_count: 0,
        }
    }

    /// Takes the baseline CPU reading and fixes the core count.
    ///
    /// When the CPU provider fails, the core count falls back to the
    /// parallelism reported by the OS and the first delta is computed on the
    /// next successful read.
    pub fn prime(&mut self) -> usize {
        match self.providers.cpu.read() {
            Ok(baseline) => {
                self.core_count = baseline.len();
                self.prior_cpu = Some(baseline);
            }
            Err(e) => {
                self.core_count = std::thread::available_parallelism().map_or(1, usize::from);
                tracing::warn!(error = %e, cores = self.core_count, "CPU baseline unavailable");
            }
        }
        self.last_cpu = vec![0.0; self.core_count];
        tracing::debug!(cores = self.core_count, "sampler primed");
        self.core_count
    }

    /// Number of CPU cores being sampled.
    #[must_use]
    pub const fn core_count(&self) -> usize {
        self.core_count
    }

    /// Whether GPU metrics are produced.
    #[must_use]
    pub const fn has_gpu(&self) -> bool {
        self.providers.gpu.is_some()
    }

    /// Reads every provider once.
    ///
    /// # Errors
    ///
    /// Returns the first [`PerfpaneError::Provider`] encountered; the caller
    /// decides whether to retry or fall back.
    pub fn take_snapshot(&self) -> Result<MetricSnapshot> {
        Ok(MetricSnapshot {
            cpu: self.providers.cpu.read()?,
            memory: self.providers.memory.read()?,
            gpu: self
                .providers
                .gpu
                .as_ref()
                .map(|gpu| gpu.read())
                .transpose()?,
        })
    }

    /// Converts two full snapshots into one tick's samples.
    #[must_use]
    pub fn compute(prior: &MetricSnapshot, current: &MetricSnapshot) -> SampleSet {
        assemble(
            core_fractions(&prior.cpu, &current.cpu),
            current.gpu.as_ref().map(gpu_readings),
            mem_fraction(&current.memory),
        )
    }

    /// Produces this tick's samples. Never fails: a failed provider or a
    /// counter that did not advance is replaced by its last known-good value,
    /// or `0` before any success.
    pub fn sample(&mut self) -> SampleSet {
        let cpu = self.sample_cpu();
        let gpu = self.sample_gpu();
        let memory = self.sample_memory();
        assemble(cpu, gpu, memory)
    }

    fn sample_cpu(&mut self) -> Vec<f64> {
        let current = match self.providers.cpu.read() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "CPU provider failed, holding last sample");
                self.last_cpu.resize(self.core_count, 0.0);
                return self.last_cpu.clone();
            }
        };

        let fractions: Vec<f64> = match &self.prior_cpu {
            Some(prior) => current
                .iter()
                .enumerate()
                .map(|(core, now)| {
                    let Some(before) = prior.get(core) else {
                        return 0.0;
                    };
                    try_core_fraction(core, before, now).unwrap_or_else(|e| {
                        tracing::debug!(error = %e, "holding last CPU value");
                        self.last_cpu.get(core).copied().unwrap_or(0.0)
                    })
                })
                .collect(),
            None => vec![0.0; current.len()],
        };

        if current.len() != self.core_count {
            tracing::info!(from = self.core_count, to = current.len(), "CPU core count changed");
            self.core_count = current.len();
        }
        self.prior_cpu = Some(current);
        self.last_cpu.clone_from(&fractions);
        fractions
    }

    fn sample_memory(&mut self) -> f64 {
        match self.providers.memory.read() {
            Ok(counters) => {
                self.last_memory = mem_fraction(&counters);
            }
            Err(e) => {
                tracing::warn!(error = %e, "memory provider failed, holding last sample");
            }
        }
        self.last_memory
    }

    fn sample_gpu(&mut self) -> Option<GpuReadings> {
        let gpu = self.providers.gpu.as_ref()?;
        match gpu.read() {
            Ok(counters) => {
                self.last_gpu = gpu_readings(&counters);
            }
            Err(e) => {
                tracing::warn!(error = %e, "GPU provider failed, holding last sample");
            }
        }
        Some(self.last_gpu)
    }
}
