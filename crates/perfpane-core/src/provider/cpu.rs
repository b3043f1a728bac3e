//! Per-core CPU time-in-state counters from `/proc/stat`.

use std::path::{Path, PathBuf};

use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{CpuTimes, TextEncoding};

use super::{MetricProvider, parse_counter, read_source};

const NAME: &str = "cpu";

/// Reads the `cpuN` lines of a `/proc/stat`-formatted file.
#[derive(Debug, Clone)]
pub struct ProcStatProvider {
    path: PathBuf,
    encoding: TextEncoding,
}

impl ProcStatProvider {
    /// Creates a provider reading `path`.
    #[must_use]
    pub fn new(path: &Path, encoding: TextEncoding) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding,
        }
    }
}

impl MetricProvider<Vec<CpuTimes>> for ProcStatProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self) -> Result<Vec<CpuTimes>> {
        parse_proc_stat(&read_source(NAME, &self.path, self.encoding)?)
    }
}

/// Parses the per-core lines (`cpu0`, `cpu1`, ...) of `/proc/stat`.
///
/// The aggregate `cpu` line is skipped. Cores are returned in file order.
///
/// # Errors
///
/// Returns [`PerfpaneError::Provider`] if a core line has fewer than eight
/// counters or a non-numeric counter, or if no core line is present.
pub fn parse_proc_stat(content: &str) -> Result<Vec<CpuTimes>> {
    let mut cores = Vec::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        let is_core = label
            .strip_prefix("cpu")
            .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()));
        if !is_core {
            continue;
        }

        let fields = parts
            .map(|raw| parse_counter::<u64>(NAME, raw))
            .collect::<Result<Vec<_>>>()?;
        let times = CpuTimes::from_fields(&fields).ok_or_else(|| {
            PerfpaneError::provider(
                NAME,
                format!(
                    "{label} has {} counters, expected {}",
                    fields.len(),
                    CpuTimes::FIELDS
                ),
            )
        })?;
        cores.push(times);
    }

    if cores.is_empty() {
        return Err(PerfpaneError::provider(NAME, "no per-core lines found"));
    }
    Ok(cores)
}
