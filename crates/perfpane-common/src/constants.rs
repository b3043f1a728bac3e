//! System-wide constants and default paths.

/// Default refresh interval of the sampling/render cycle, in seconds.
pub const DEFAULT_REFRESH_SECS: f64 = 0.5;

/// Default gauge width in ticks (excluding the two bracket characters).
pub const DEFAULT_BAR_WIDTH: usize = 30;

/// Default number of rows in the gauge grid.
pub const DEFAULT_ROWS: usize = 3;

/// Scrollback capacity used when it cannot be derived from the terminal.
pub const DEFAULT_SCROLLBACK_CAPACITY: usize = 1000;

/// How often captured host output is drained into the scrollback region.
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 50;

/// Smallest scrollback region (inner rows) the surface accepts.
pub const MIN_OUTPUT_ROWS: u16 = 1;

/// Rows taken by the top and bottom border of a boxed region.
pub const BORDER_ROWS: u16 = 2;

/// Kernel per-CPU time-in-state counters.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Kernel memory accounting file.
pub const MEMINFO_PATH: &str = "/proc/meminfo";

/// NVIDIA management CLI used for GPU readings.
pub const NVIDIA_SMI: &str = "nvidia-smi";

/// Label prefix for per-core CPU gauges (`CPU0`, `CPU1`, ...).
pub const CPU_LABEL: &str = "CPU";

/// Label of the GPU utilization gauge.
pub const GPU_UTIL_LABEL: &str = "GPU0";

/// Label of the GPU memory gauge.
pub const GPU_MEM_LABEL: &str = "VRAM";

/// Label of the GPU temperature readout.
pub const GPU_TEMP_LABEL: &str = "TEMP";

/// Label of the host memory gauge.
pub const MEM_LABEL: &str = "DRAM";

/// Binary name for the CLI, also shown in the gauge box title.
pub const BIN_NAME: &str = "perfpane";

/// Name of the background sampling/render thread.
pub const WORKER_THREAD_NAME: &str = "perfpane-worker";
