//! Raw counter sources.
//!
//! One [`MetricProvider`] per category. Providers are synchronous and may
//! block on external commands; the sampler calls them from the worker thread
//! so the host program never waits on them.

pub mod cpu;
pub mod gpu;
pub mod memory;

use std::path::Path;

use perfpane_common::config::ProfilerConfig;
use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{CpuTimes, GpuCounters, MemCounters, TextEncoding};

pub use cpu::ProcStatProvider;
pub use gpu::NvidiaSmiProvider;
pub use memory::MemInfoProvider;

/// A source of raw counters of type `T`.
pub trait MetricProvider<T>: Send {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Reads the current counters.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::Provider`] if the source is unreachable or
    /// its output does not parse.
    fn read(&self) -> Result<T>;
}

/// The providers backing one sampler.
pub struct ProviderSet {
    /// Per-core CPU counters.
    pub cpu: Box<dyn MetricProvider<Vec<CpuTimes>>>,
    /// Host memory counters.
    pub memory: Box<dyn MetricProvider<MemCounters>>,
    /// GPU counters, absent when GPU gauges are disabled.
    pub gpu: Option<Box<dyn MetricProvider<GpuCounters>>>,
}

impl std::fmt::Debug for ProviderSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSet")
            .field("cpu", &self.cpu.name())
            .field("memory", &self.memory.name())
            .field("gpu", &self.gpu.as_ref().map(|g| g.name()))
            .finish()
    }
}

impl ProviderSet {
    /// Builds the host providers described by `config`.
    ///
    /// The GPU provider is skipped when disabled, or when the query binary
    /// cannot be found on `PATH`.
    #[must_use]
    pub fn from_config(config: &ProfilerConfig) -> Self {
        let encoding = config.text_encoding;
        let gpu: Option<Box<dyn MetricProvider<GpuCounters>>> = if config.gpu {
            match which::which(&config.nvidia_smi) {
                Ok(path) => {
                    tracing::info!(binary = %path.display(), "GPU gauges enabled");
                    Some(Box::new(NvidiaSmiProvider::new(
                        path.to_string_lossy().into_owned(),
                        config.provider_timeout(),
                        encoding,
                    )))
                }
                Err(e) => {
                    tracing::info!(binary = %config.nvidia_smi, error = %e, "GPU query tool not found, GPU gauges disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            cpu: Box::new(ProcStatProvider::new(&config.proc_stat_path, encoding)),
            memory: Box::new(MemInfoProvider::new(&config.meminfo_path, encoding)),
            gpu,
        }
    }
}

/// Reads a kernel text file and decodes it.
pub(crate) fn read_source(
    provider: &'static str,
    path: &Path,
    encoding: TextEncoding,
) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| {
        PerfpaneError::provider(provider, format!("cannot read {}: {e}", path.display()))
    })?;
    encoding
        .decode(&bytes)
        .map_err(|e| PerfpaneError::provider(provider, e))
}

/// Parses one counter field, tolerating a trailing unit such as `MiB` or `%`.
pub(crate) fn parse_counter<T: std::str::FromStr>(provider: &'static str, raw: &str) -> Result<T> {
    let trimmed = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%')
        .trim();
    trimmed
        .parse()
        .map_err(|_| PerfpaneError::provider(provider, format!("unparsable counter {raw:?}")))
}
