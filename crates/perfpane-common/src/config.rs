//! Configuration model for the profiler overlay.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{PerfpaneError, Result};
use crate::types::TextEncoding;

/// Root configuration for the profiler overlay.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilerConfig {
    /// Seconds between sampling ticks.
    pub refresh_secs: f64,
    /// Gauge width in ticks.
    pub bar_width: usize,
    /// Rows in the gauge grid.
    pub rows: usize,
    /// Lines of host output retained between drains. Derived from the
    /// terminal height when unset.
    pub scrollback_capacity: Option<usize>,
    /// Encoding used to decode provider output.
    pub text_encoding: TextEncoding,
    /// Upper bound on one provider call. Defaults to `refresh_secs`.
    pub provider_timeout_secs: Option<f64>,
    /// Milliseconds between scrollback drains.
    pub drain_interval_ms: u64,
    /// Whether GPU gauges are shown.
    pub gpu: bool,
    /// Source of per-core CPU counters.
    pub proc_stat_path: PathBuf,
    /// Source of memory counters.
    pub meminfo_path: PathBuf,
    /// GPU query binary.
    pub nvidia_smi: String,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            refresh_secs: constants::DEFAULT_REFRESH_SECS,
            bar_width: constants::DEFAULT_BAR_WIDTH,
            rows: constants::DEFAULT_ROWS,
            scrollback_capacity: None,
            text_encoding: TextEncoding::default(),
            provider_timeout_secs: None,
            drain_interval_ms: constants::DEFAULT_DRAIN_INTERVAL_MS,
            gpu: true,
            proc_stat_path: PathBuf::from(constants::PROC_STAT_PATH),
            meminfo_path: PathBuf::from(constants::MEMINFO_PATH),
            nvidia_smi: constants::NVIDIA_SMI.to_string(),
        }
    }
}

impl ProfilerConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or holds
    /// invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PerfpaneError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(self.refresh_secs.is_finite() && self.refresh_secs > 0.0) {
            return Err(invalid(format!(
                "refresh_secs must be positive, got {}",
                self.refresh_secs
            )));
        }
        if self.bar_width == 0 {
            return Err(invalid("bar_width must be at least 1"));
        }
        if self.rows == 0 {
            return Err(invalid("rows must be at least 1"));
        }
        if self.scrollback_capacity == Some(0) {
            return Err(invalid("scrollback_capacity must be at least 1"));
        }
        if let Some(timeout) = self.provider_timeout_secs {
            if !(timeout.is_finite() && timeout > 0.0) {
                return Err(invalid(format!(
                    "provider_timeout_secs must be positive, got {timeout}"
                )));
            }
        }
        if self.drain_interval_ms == 0 {
            return Err(invalid("drain_interval_ms must be at least 1"));
        }
        Ok(())
    }

    /// Interval between sampling ticks.
    #[must_use]
    pub fn refresh(&self) -> Duration {
        Duration::from_secs_f64(self.refresh_secs)
    }

    /// Upper bound on a single provider call.
    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.provider_timeout_secs.unwrap_or(self.refresh_secs))
    }

    /// Interval between scrollback drains, never longer than the refresh.
    #[must_use]
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms).min(self.refresh())
    }

    /// Scrollback capacity, derived from the terminal height when unset.
    ///
    /// The derived value is the number of rows left below the gauge box, so
    /// the buffer never holds more than one screen of output between drains.
    #[must_use]
    pub fn scrollback_for(&self, terminal_rows: Option<u16>) -> usize {
        if let Some(capacity) = self.scrollback_capacity {
            return capacity;
        }
        let gauge_box = self.rows.saturating_add(usize::from(constants::BORDER_ROWS));
        terminal_rows
            .map(usize::from)
            .and_then(|rows| rows.checked_sub(gauge_box + usize::from(constants::BORDER_ROWS)))
            .filter(|rows| *rows > 0)
            .unwrap_or(constants::DEFAULT_SCROLLBACK_CAPACITY)
    }
}

fn invalid(message: impl Into<String>) -> PerfpaneError {
    PerfpaneError::Config {
        message: message.into(),
    }
}
