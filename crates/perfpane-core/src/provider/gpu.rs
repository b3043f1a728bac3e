//! GPU readings from `nvidia-smi`.
//!
//! Only the first GPU is read; one reading per refresh.

use std::time::Duration;

use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{GpuCounters, TextEncoding};

use super::{MetricProvider, parse_counter};
use crate::command::run_command;

const NAME: &str = "gpu";

/// Query arguments; field order matches [`parse_nvidia_smi`].
pub const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=temperature.gpu,memory.used,memory.total,utilization.gpu",
    "--format=csv,noheader,nounits",
];

/// Runs `nvidia-smi` with a bounded deadline.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProvider {
    binary: String,
    timeout: Duration,
    encoding: TextEncoding,
}

impl NvidiaSmiProvider {
    /// Creates a provider invoking `binary`.
    #[must_use]
    pub const fn new(binary: String, timeout: Duration, encoding: TextEncoding) -> Self {
        Self {
            binary,
            timeout,
            encoding,
        }
    }
}

impl MetricProvider<GpuCounters> for NvidiaSmiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self) -> Result<GpuCounters> {
        let out = run_command(NAME, &self.binary, &QUERY_ARGS, self.timeout, self.encoding)?;
        parse_nvidia_smi(&out)
    }
}

/// Parses the first line of `temperature, memory.used, memory.total,
/// utilization` CSV output.
///
/// Unit suffixes (`MiB`, `%`, `C`) are tolerated so the table-style output
/// of older driver versions parses too.
///
/// # Errors
///
/// Returns [`PerfpaneError::Provider`] if the line is missing, has the wrong
/// number of fields, or a field is not numeric (e.g. `[N/A]`).
pub fn parse_nvidia_smi(content: &str) -> Result<GpuCounters> {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| PerfpaneError::provider(NAME, "empty output"))?;

    let fields: Vec<&str> = line.split(',').collect();
    let [temperature, memory_used, memory_total, utilization] = fields[..] else {
        return Err(PerfpaneError::provider(
            NAME,
            format!("expected 4 fields, got {}: {line:?}", fields.len()),
        ));
    };

    Ok(GpuCounters {
        temperature: parse_counter(NAME, temperature)?,
        memory_used: parse_counter(NAME, memory_used)?,
        memory_total: parse_counter(NAME, memory_total)?,
        utilization_pct: parse_counter(NAME, utilization)?,
    })
}
