//! Row-major assignment of metrics to grid cells.
//!
//! With `cols = ceil(n / rows)`, metric `i` sits at `(i / cols, i % cols)`.
//! The grid has `rows * cols` cells; those past `n` are padding.

use perfpane_common::error::{PerfpaneError, Result};

/// Shape of the gauge grid for a fixed number of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    rows: usize,
    cols: usize,
    metrics: usize,
}

/// Computes the grid for `num_metrics` cells over `rows` rows.
///
/// # Errors
///
/// Returns [`PerfpaneError::Config`] if `rows` is zero.
pub fn compute_layout(num_metrics: usize, rows: usize) -> Result<GridLayout> {
    if rows == 0 {
        return Err(PerfpaneError::Config {
            message: "gauge grid needs at least one row".into(),
        });
    }
    let layout = GridLayout {
        rows,
        cols: num_metrics.div_ceil(rows),
        metrics: num_metrics,
    };
    tracing::debug!(rows, cols = layout.cols, metrics = num_metrics, "layout computed");
    Ok(layout)
}

impl GridLayout {
    /// Configured row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Column count, `ceil(metrics / rows)`.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of real (non-padding) cells.
    #[must_use]
    pub const fn metric_count(&self) -> usize {
        self.metrics
    }

    /// Total cells including padding.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Grid position of metric `index`, or `None` past the last metric.
    #[must_use]
    pub const fn position(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.metrics {
            return None;
        }
        Some((index / self.cols, index % self.cols))
    }

    /// Position of every cell, padding included, in index order.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.capacity()).map(|i| (i / self.cols, i % self.cols))
    }
}
