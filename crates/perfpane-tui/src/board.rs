//! The gauge grid, filled in place on every render tick.

use perfpane_common::error::Result;
use perfpane_common::types::SampleSet;

use crate::bar::render_sample;
use crate::layout::{GridLayout, compute_layout};

/// One display cell. Padding cells have an empty label and text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridCell {
    /// Grid row.
    pub row: usize,
    /// Grid column.
    pub col: usize,
    /// Metric label, e.g. `CPU3` or `DRAM`.
    pub label: String,
    /// Rendered gauge text.
    pub text: String,
}

impl GridCell {
    /// Whether this cell only pads the grid out to capacity.
    #[must_use]
    pub fn is_padding(&self) -> bool {
        self.label.is_empty()
    }
}

/// Layout plus the cells it owns.
#[derive(Debug, Clone)]
pub struct GaugeBoard {
    layout: GridLayout,
    bar_width: usize,
    cells: Vec<GridCell>,
}

impl GaugeBoard {
    /// Builds a board for the given cell labels.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `rows` is zero.
    pub fn new(labels: Vec<String>, rows: usize, bar_width: usize) -> Result<Self> {
        let layout = compute_layout(labels.len(), rows)?;
        let mut board = Self {
            layout,
            bar_width,
            cells: Vec::new(),
        };
        board.place(labels);
        Ok(board)
    }

    /// Builds a board sized for the cells of `samples`, then fills it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `rows` is zero.
    pub fn for_samples(samples: &SampleSet, rows: usize, bar_width: usize) -> Result<Self> {
        let mut board = Self::new(cell_labels(samples), rows, bar_width)?;
        let _ = board.update(samples)?;
        Ok(board)
    }

    /// Writes the rendered text of each sample into its cell.
    ///
    /// The layout is recomputed only when the number of metric cells
    /// changed; returns whether that happened.
    ///
    /// # Errors
    ///
    /// Propagates layout errors from the recomputation.
    pub fn update(&mut self, samples: &SampleSet) -> Result<bool> {
        let relaid = samples.cell_count() != self.layout.metric_count();
        if relaid {
            tracing::info!(
                before = self.layout.metric_count(),
                after = samples.cell_count(),
                "metric cell count changed, recomputing layout"
            );
            self.layout = compute_layout(samples.cell_count(), self.layout.rows())?;
            self.place(cell_labels(samples));
        }

        let texts = samples.metrics.iter().flat_map(|metric| {
            metric
                .cell_labels()
                .into_iter()
                .zip(render_sample(&metric.sample, self.bar_width))
        });
        for (cell, (label, text)) in self.cells.iter_mut().zip(texts) {
            cell.label = label;
            cell.text = text;
        }
        Ok(relaid)
    }

    /// Re-lays the existing cells over `rows` rows, keeping their text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `rows` is zero.
    pub fn relayout(&mut self, rows: usize) -> Result<()> {
        if rows == self.layout.rows() {
            return Ok(());
        }
        let kept: Vec<GridCell> = self
            .cells
            .drain(..)
            .filter(|cell| !cell.is_padding())
            .collect();
        self.layout = compute_layout(kept.len(), rows)?;
        let texts: Vec<String> = kept.iter().map(|cell| cell.text.clone()).collect();
        self.place(kept.into_iter().map(|cell| cell.label).collect());
        for (cell, text) in self.cells.iter_mut().zip(texts) {
            cell.text = text;
        }
        tracing::info!(rows, cols = self.layout.cols(), "gauge grid re-laid");
        Ok(())
    }

    fn place(&mut self, labels: Vec<String>) {
        let mut labels = labels.into_iter();
        self.cells = self
            .layout
            .positions()
            .map(|(row, col)| GridCell {
                row,
                col,
                label: labels.next().unwrap_or_default(),
                text: String::new(),
            })
            .collect();
    }

    /// One text line per grid row.
    ///
    /// Labels are padded to the widest label, cells are separated by two
    /// spaces, and trailing whitespace is trimmed.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let label_width = self
            .cells
            .iter()
            .map(|cell| cell.label.chars().count())
            .max()
            .unwrap_or(0);
        let cell_width = label_width + 1 + self.bar_width + 2;

        let mut lines = vec![String::new(); self.layout.rows()];
        for cell in &self.cells {
            let line = &mut lines[cell.row];
            if cell.col > 0 {
                line.push_str("  ");
            }
            let text = format!("{:<label_width$} {}", cell.label, cell.text);
            line.push_str(&format!("{text:<cell_width$}"));
        }
        for line in &mut lines {
            line.truncate(line.trim_end().len());
        }
        lines
    }

    /// Current layout.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.layout.rows()
    }

    /// Column count.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.layout.cols()
    }

    /// Number of non-padding cells.
    #[must_use]
    pub const fn metric_count(&self) -> usize {
        self.layout.metric_count()
    }

    /// All cells, padding included, in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Gauge width in ticks.
    #[must_use]
    pub const fn bar_width(&self) -> usize {
        self.bar_width
    }
}

fn cell_labels(samples: &SampleSet) -> Vec<String> {
    samples.metrics.iter().flat_map(|m| m.cell_labels()).collect()
}
