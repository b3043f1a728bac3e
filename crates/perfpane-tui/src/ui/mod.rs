//! Frame composition: gauge box on top, output box filling the rest.

pub mod gauges;
pub mod scrollback;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use perfpane_common::constants::BORDER_ROWS;

use self::scrollback::ScrollbackView;

/// Renders a full frame.
pub fn render(frame: &mut Frame, gauge_lines: &[String], gauge_rows: usize, output: &ScrollbackView) {
    let gauge_height = u16::try_from(gauge_rows)
        .unwrap_or(u16::MAX)
        .saturating_add(BORDER_ROWS);
    let [gauge_area, output_area] =
        Layout::vertical([Constraint::Length(gauge_height), Constraint::Min(0)]).areas(frame.area());
    gauges::render_gauges(frame, gauge_area, gauge_lines);
    scrollback::render_scrollback(frame, output_area, output);
}
