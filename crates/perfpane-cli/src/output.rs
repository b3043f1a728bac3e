//! Formatted output helpers for CLI commands.

use perfpane_common::constants::{GPU_MEM_LABEL, GPU_TEMP_LABEL, MEM_LABEL};
use perfpane_common::types::MetricSnapshot;

const MIB: u64 = 1024 * 1024;

/// Formats a byte count into a human-readable string (e.g., "128.0 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Absolute memory figures of a snapshot, e.g. `DRAM 2.0 GiB / 8.0 GiB`.
///
/// GPU memory is reported by the driver in MiB.
#[must_use]
pub fn memory_summary(snapshot: &MetricSnapshot) -> String {
    let mut summary = format!(
        "{MEM_LABEL} {} / {}",
        format_bytes(snapshot.memory.used),
        format_bytes(snapshot.memory.total)
    );
    if let Some(gpu) = &snapshot.gpu {
        summary.push_str(&format!(
            "  {GPU_MEM_LABEL} {} / {}  {GPU_TEMP_LABEL} {}",
            format_bytes(gpu.memory_used.saturating_mul(MIB)),
            format_bytes(gpu.memory_total.saturating_mul(MIB)),
            gpu.temperature
        ));
    }
    summary
}
