//! The bordered gauge box.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph};

use perfpane_common::constants::BIN_NAME;

/// Draws one line per gauge row inside a titled border.
pub fn render_gauges(frame: &mut Frame, area: Rect, lines: &[String]) {
    let block = Block::bordered().title(format!(" {BIN_NAME} "));
    let lines: Vec<Line> = lines.iter().map(|l| Line::raw(l.as_str())).collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
