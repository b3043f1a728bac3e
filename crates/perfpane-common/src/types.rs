//! Domain primitive types used across the perfpane workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PerfpaneError;

/// Clamps a utilization value into `[0, 1]`, mapping NaN to `0`.
#[must_use]
pub fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Time-in-state counters of a single CPU core, in kernel ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTimes {
    /// Normal processes in user mode.
    pub user: u64,
    /// Niced processes in user mode.
    pub nice: u64,
    /// Kernel mode.
    pub system: u64,
    /// Idle.
    pub idle: u64,
    /// Waiting for I/O to complete.
    pub iowait: u64,
    /// Servicing interrupts.
    pub irq: u64,
    /// Servicing softirqs.
    pub softirq: u64,
    /// Involuntary wait while a hypervisor ran another guest.
    pub steal: u64,
}

impl CpuTimes {
    /// Number of counters in one record.
    pub const FIELDS: usize = 8;

    /// Builds a record from counters in `/proc/stat` column order.
    ///
    /// Returns `None` when fewer than [`Self::FIELDS`] values are given;
    /// extra trailing values (guest time) are ignored.
    #[must_use]
    pub fn from_fields(fields: &[u64]) -> Option<Self> {
        let [user, nice, system, idle, iowait, irq, softirq, steal, ..] = *fields else {
            return None;
        };
        Some(Self {
            user,
            nice,
            system,
            idle,
            iowait,
            irq,
            softirq,
            steal,
        })
    }

    /// Sum of all eight counters.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
            .saturating_add(self.steal)
    }

    /// Non-busy time: idle plus iowait.
    #[must_use]
    pub const fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Per-field `self - prior`, saturating at zero when a counter went
    /// backwards (reset or wraparound).
    #[must_use]
    pub const fn saturating_delta(&self, prior: &Self) -> Self {
        Self {
            user: self.user.saturating_sub(prior.user),
            nice: self.nice.saturating_sub(prior.nice),
            system: self.system.saturating_sub(prior.system),
            idle: self.idle.saturating_sub(prior.idle),
            iowait: self.iowait.saturating_sub(prior.iowait),
            irq: self.irq.saturating_sub(prior.irq),
            softirq: self.softirq.saturating_sub(prior.softirq),
            steal: self.steal.saturating_sub(prior.steal),
        }
    }
}

/// Host memory counters, both in the same unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemCounters {
    /// Memory in use.
    pub used: u64,
    /// Total installed memory.
    pub total: u64,
}

/// One GPU reading as reported by the vendor tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuCounters {
    /// Core temperature, unitless as reported.
    pub temperature: f64,
    /// Framebuffer memory in use (MiB).
    pub memory_used: u64,
    /// Total framebuffer memory (MiB).
    pub memory_total: u64,
    /// Utilization percentage in `0..=100`.
    pub utilization_pct: f64,
}

/// Raw counters taken at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// One record per logical core, in core order.
    pub cpu: Vec<CpuTimes>,
    /// Host memory.
    pub memory: MemCounters,
    /// GPU reading, absent when GPU gauges are disabled.
    pub gpu: Option<GpuCounters>,
}

/// A derived utilization value, tagged by kind so renderers can dispatch
/// without inspecting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UtilizationSample {
    /// A single value in `[0, 1]`.
    Fraction(f64),
    /// A plain number shown as text (e.g. temperature).
    Scalar(f64),
    /// One fraction per element (e.g. per-core CPU).
    Sequence(Vec<f64>),
}

impl UtilizationSample {
    /// Builds a [`UtilizationSample::Fraction`], clamping into `[0, 1]`.
    #[must_use]
    pub fn fraction(value: f64) -> Self {
        Self::Fraction(clamp_fraction(value))
    }

    /// Builds a [`UtilizationSample::Sequence`], clamping every element.
    #[must_use]
    pub fn sequence(values: impl IntoIterator<Item = f64>) -> Self {
        Self::Sequence(values.into_iter().map(clamp_fraction).collect())
    }

    /// Number of grid cells this sample occupies.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        match self {
            Self::Fraction(_) | Self::Scalar(_) => 1,
            Self::Sequence(values) => values.len(),
        }
    }
}

/// A labelled utilization sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Display label; sequences get their element index appended per cell.
    pub label: String,
    /// The derived value.
    pub sample: UtilizationSample,
}

impl Metric {
    /// Creates a labelled metric.
    #[must_use]
    pub fn new(label: impl Into<String>, sample: UtilizationSample) -> Self {
        Self {
            label: label.into(),
            sample,
        }
    }

    /// Labels of the cells this metric expands into.
    #[must_use]
    pub fn cell_labels(&self) -> Vec<String> {
        match &self.sample {
            UtilizationSample::Sequence(values) => (0..values.len())
                .map(|i| format!("{}{i}", self.label))
                .collect(),
            UtilizationSample::Fraction(_) | UtilizationSample::Scalar(_) => {
                vec![self.label.clone()]
            }
        }
    }
}

/// The ordered metrics produced by one sampling tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Metrics in display order.
    pub metrics: Vec<Metric>,
}

impl SampleSet {
    /// Total number of grid cells needed to show every metric.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.metrics.iter().map(|m| m.sample.cell_count()).sum()
    }

    /// Looks up a metric by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&UtilizationSample> {
        self.metrics
            .iter()
            .find(|m| m.label == label)
            .map(|m| &m.sample)
    }
}

/// Text encoding used to decode raw provider output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Strict UTF-8.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to one code point.
    Latin1,
    /// 7-bit ASCII; any high byte is an error.
    Ascii,
}

impl TextEncoding {
    /// Canonical name of the encoding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin1",
            Self::Ascii => "ascii",
        }
    }

    /// Decodes raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::Decode`] if the bytes are not valid in this
    /// encoding.
    pub fn decode(self, bytes: &[u8]) -> crate::error::Result<String> {
        let invalid = || PerfpaneError::Decode {
            encoding: self.name(),
        };
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid()),
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
            Self::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().copied().map(char::from).collect())
                } else {
                    Err(invalid())
                }
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = PerfpaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            other => Err(PerfpaneError::Config {
                message: format!("unsupported text encoding: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_times_requires_eight_fields() {
        assert!(CpuTimes::from_fields(&[1, 2, 3, 4, 5, 6, 7]).is_none());
        let t = CpuTimes::from_fields(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).expect("fields");
        assert_eq!(t.steal, 8);
        assert_eq!(t.total(), 36);
        assert_eq!(t.idle_total(), 9);
    }

    #[test]
    fn saturating_delta_never_goes_negative() {
        let prior = CpuTimes::from_fields(&[50, 0, 0, 100, 0, 0, 0, 0]).expect("fields");
        let reset = CpuTimes::from_fields(&[10, 0, 0, 20, 0, 0, 0, 0]).expect("fields");
        assert_eq!(reset.saturating_delta(&prior), CpuTimes::default());
    }

    #[test]
    fn clamp_fraction_handles_out_of_range_and_nan() {
        assert!((clamp_fraction(1.7) - 1.0).abs() < f64::EPSILON);
        assert!(clamp_fraction(-0.3).abs() < f64::EPSILON);
        assert!(clamp_fraction(f64::NAN).abs() < f64::EPSILON);
    }

    #[test]
    fn sequence_metric_expands_labels() {
        let m = Metric::new("CPU", UtilizationSample::sequence([0.1, 0.2, 0.3]));
        assert_eq!(m.cell_labels(), vec!["CPU0", "CPU1", "CPU2"]);
        let set = SampleSet {
            metrics: vec![m, Metric::new("TEMP", UtilizationSample::Scalar(61.0))],
        };
        assert_eq!(set.cell_count(), 4);
        assert_eq!(set.get("TEMP"), Some(&UtilizationSample::Scalar(61.0)));
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        let text = TextEncoding::Latin1.decode(&[0x34, 0x32, 0xB0]).expect("decode");
        assert_eq!(text, "42\u{b0}");
        assert!(TextEncoding::Utf8.decode(&[0xB0]).is_err());
        assert!(TextEncoding::Ascii.decode(&[0xB0]).is_err());
    }

    #[test]
    fn encoding_parses_common_names() {
        assert_eq!("UTF-8".parse::<TextEncoding>().expect("utf8"), TextEncoding::Utf8);
        assert_eq!("iso-8859-1".parse::<TextEncoding>().expect("latin1"), TextEncoding::Latin1);
        assert!("ebcdic".parse::<TextEncoding>().is_err());
    }
}
