//! Host memory counters from `/proc/meminfo`.

use std::path::{Path, PathBuf};

use perfpane_common::error::{PerfpaneError, Result};
use perfpane_common::types::{MemCounters, TextEncoding};

use super::{MetricProvider, parse_counter, read_source};

const NAME: &str = "memory";

/// Reads used and total memory from a `/proc/meminfo`-formatted file.
#[derive(Debug, Clone)]
pub struct MemInfoProvider {
    path: PathBuf,
    encoding: TextEncoding,
}

impl MemInfoProvider {
    /// Creates a provider reading `path`.
    #[must_use]
    pub fn new(path: &Path, encoding: TextEncoding) -> Self {
        Self {
            path: path.to_path_buf(),
            encoding,
        }
    }
}

impl MetricProvider<MemCounters> for MemInfoProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn read(&self) -> Result<MemCounters> {
        parse_meminfo(&read_source(NAME, &self.path, self.encoding)?)
    }
}

/// Parses `/proc/meminfo` into byte counters.
///
/// `used` is `MemTotal - MemAvailable`. Kernels without `MemAvailable` fall
/// back to `MemFree + Buffers + Cached`.
///
/// # Errors
///
/// Returns [`PerfpaneError::Provider`] if `MemTotal` is missing or neither
/// availability estimate can be formed.
pub fn parse_meminfo(content: &str) -> Result<MemCounters> {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    let mut buffers = None;
    let mut cached = None;

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            "MemFree" => &mut free,
            "Buffers" => &mut buffers,
            "Cached" => &mut cached,
            _ => continue,
        };
        // Values are in kB.
        *slot = Some(parse_counter::<u64>(NAME, value)?.saturating_mul(1024));
    }

    let total = total.ok_or_else(|| PerfpaneError::provider(NAME, "MemTotal missing"))?;
    let available = match (available, free) {
        (Some(available), _) => available,
        (None, Some(free)) => free
            .saturating_add(buffers.unwrap_or(0))
            .saturating_add(cached.unwrap_or(0)),
        (None, None) => {
            return Err(PerfpaneError::provider(
                NAME,
                "neither MemAvailable nor MemFree present",
            ));
        }
    };

    Ok(MemCounters {
        used: total.saturating_sub(available),
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn used_is_total_minus_available() {
        let meminfo = "MemTotal:       8192 kB\nMemFree:        1024 kB\nMemAvailable:   6144 kB\n";
        let mem = parse_meminfo(meminfo).expect("parse");
        assert_eq!(mem.total, 8192 * 1024);
        assert_eq!(mem.used, 2048 * 1024);
    }

    #[test]
    fn falls_back_to_free_buffers_cached() {
        let meminfo = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 250 kB\n";
        let mem = parse_meminfo(meminfo).expect("parse");
        assert_eq!(mem.used, 600 * 1024);
    }

    #[test]
    fn missing_total_is_an_error() {
        assert!(parse_meminfo("MemFree: 100 kB\n").is_err());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("meminfo");
        std::fs::write(&path, "MemTotal: 4 kB\nMemAvailable: 1 kB\n").expect("write meminfo");
        let mem = MemInfoProvider::new(&path, TextEncoding::Ascii)
            .read()
            .expect("read");
        assert_eq!(mem.used, 3 * 1024);
    }
}
