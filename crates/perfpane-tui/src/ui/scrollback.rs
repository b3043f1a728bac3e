//! The scrolling host-output box under the gauges.

use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};

/// Most recent output lines, bounded to `capacity`.
///
/// Text pushed without a trailing newline leaves the last line open, and the
/// next push continues it.
#[derive(Debug, Clone)]
pub struct ScrollbackView {
    lines: VecDeque<String>,
    open: bool,
    capacity: usize,
}

impl ScrollbackView {
    /// Creates an empty view retaining at most `capacity` lines (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            open: false,
            capacity: capacity.max(1),
        }
    }

    /// Appends drained output.
    pub fn push(&mut self, text: &str) {
        for segment in text.split_inclusive('\n') {
            let complete = segment.ends_with('\n');
            let content = segment.trim_end_matches(['\n', '\r']);
            match self.lines.back_mut() {
                Some(last) if self.open => last.push_str(content),
                _ => self.lines.push_back(content.to_owned()),
            }
            self.open = !complete;
        }
        while self.lines.len() > self.capacity {
            let _ = self.lines.pop_front();
        }
    }

    /// Number of retained lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no output has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The last `height` lines, oldest first.
    pub fn tail(&self, height: usize) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .skip(self.lines.len().saturating_sub(height))
            .map(String::as_str)
    }
}

/// Draws the bordered output box holding the lines that fit.
pub fn render_scrollback(frame: &mut Frame, area: Rect, view: &ScrollbackView) {
    let block = Block::bordered();
    let height = usize::from(block.inner(area).height);
    let lines: Vec<Line> = view.tail(height).map(Line::raw).collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
