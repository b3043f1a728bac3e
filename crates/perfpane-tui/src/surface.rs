//! The terminal the overlay draws on.
//!
//! The screen is split into a bordered gauge box of `rows + 2` lines and a
//! bordered output box below it that shows the most recent host output.
//!
//! A surface on the alternate screen also installs a panic hook that leaves
//! it again, since with `panic = "abort"` no destructor runs.

use std::io::{self, Stdout, Write};
use std::panic;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};

use perfpane_common::constants::{BORDER_ROWS, DEFAULT_SCROLLBACK_CAPACITY, MIN_OUTPUT_ROWS};
use perfpane_common::error::{PerfpaneError, Result};

use crate::board::GaugeBoard;
use crate::ui::{self, scrollback::ScrollbackView};

/// Terminal primitives the render loop needs.
pub trait RenderSurface: Send {
    /// Prepares the terminal for drawing.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the terminal cannot be
    /// taken over.
    fn initialize(&mut self) -> Result<()>;

    /// How many gauge rows still fit at the current terminal size.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the size cannot be read.
    fn max_gauge_rows(&mut self) -> Result<usize>;

    /// Paints the gauge region.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the board no longer fits
    /// or drawing fails.
    fn paint(&mut self, board: &GaugeBoard) -> Result<()>;

    /// Appends drained host output to the scrolling region.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if drawing fails.
    fn append_output(&mut self, text: &str) -> Result<()>;

    /// Restores the terminal. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the terminal cannot be
    /// restored.
    fn teardown(&mut self) -> Result<()>;
}

/// Terminal height needed to show `gauge_rows` rows of gauges.
#[must_use]
pub fn required_height(gauge_rows: usize) -> usize {
    gauge_rows + usize::from(BORDER_ROWS) * 2 + usize::from(MIN_OUTPUT_ROWS)
}

/// Set while an overlay holds the alternate screen.
static ALTERNATE_SCREEN_HELD: AtomicBool = AtomicBool::new(false);
static RESTORE_HOOK: Once = Once::new();

/// Chains a panic hook that restores the terminal before the previous hook
/// reports the panic.
fn install_restore_hook() {
    RESTORE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let _ = leave_alternate_screen(&mut io::stdout());
            previous(info);
        }));
    });
}

/// Leaves the alternate screen and shows the cursor if an overlay still
/// holds it. Returns whether anything was written.
fn leave_alternate_screen<W: Write>(out: &mut W) -> io::Result<bool> {
    if !ALTERNATE_SCREEN_HELD.swap(false, Ordering::SeqCst) {
        return Ok(false);
    }
    execute!(out, LeaveAlternateScreen, Show)?;
    Ok(true)
}

/// Height of the controlling terminal, if there is one.
#[must_use]
pub fn terminal_rows() -> Option<u16> {
    crossterm::terminal::size().ok().map(|(_, rows)| rows)
}

/// A [`RenderSurface`] over any `ratatui` backend.
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    alternate_screen: bool,
    active: bool,
    gauge_lines: Vec<String>,
    gauge_rows: usize,
    output: ScrollbackView,
}

impl TerminalSurface<CrosstermBackend<Stdout>> {
    /// Surface on the process's stdout, using the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the terminal cannot be
    /// opened.
    pub fn stdout() -> Result<Self> {
        let mut surface = Self::new(CrosstermBackend::new(io::stdout()))?;
        surface.alternate_screen = true;
        Ok(surface)
    }
}

impl<B: Backend> TerminalSurface<B> {
    /// Surface over `backend`, drawing in place.
    ///
    /// # Errors
    ///
    /// Returns [`PerfpaneError::RenderSurface`] if the backend cannot be
    /// queried.
    pub fn new(backend: B) -> Result<Self> {
        let terminal = Terminal::new(backend).map_err(PerfpaneError::surface)?;
        Ok(Self {
            terminal,
            alternate_screen: false,
            active: false,
            gauge_lines: Vec::new(),
            gauge_rows: 0,
            output: ScrollbackView::new(DEFAULT_SCROLLBACK_CAPACITY),
        })
    }

    /// Sets how many output lines the scrolling region retains.
    #[must_use]
    pub fn with_scrollback(mut self, capacity: usize) -> Self {
        self.output = ScrollbackView::new(capacity);
        self
    }

    /// The underlying terminal.
    #[must_use]
    pub const fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Mutable access to the underlying terminal, e.g. to resize a test
    /// backend.
    pub const fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    fn height(&self) -> Result<usize> {
        let size = self.terminal.size().map_err(PerfpaneError::surface)?;
        Ok(usize::from(size.height))
    }

    fn draw(&mut self) -> Result<()> {
        let gauge_lines = &self.gauge_lines;
        let gauge_rows = self.gauge_rows;
        let output = &self.output;
        let _ = self
            .terminal
            .draw(|frame| ui::render(frame, gauge_lines, gauge_rows, output))
            .map_err(PerfpaneError::surface)?;
        Ok(())
    }
}

impl<B: Backend + Send> RenderSurface for TerminalSurface<B> {
    fn initialize(&mut self) -> Result<()> {
        if self.alternate_screen {
            install_restore_hook();
            execute!(io::stdout(), EnterAlternateScreen, Hide).map_err(PerfpaneError::surface)?;
            ALTERNATE_SCREEN_HELD.store(true, Ordering::SeqCst);
        }
        self.terminal.clear().map_err(PerfpaneError::surface)?;
        self.active = true;
        tracing::info!(alternate_screen = self.alternate_screen, "render surface initialized");
        Ok(())
    }

    fn max_gauge_rows(&mut self) -> Result<usize> {
        Ok(self.height()?.saturating_sub(required_height(0)))
    }

    fn paint(&mut self, board: &GaugeBoard) -> Result<()> {
        let height = self.height()?;
        let needed = required_height(board.rows());
        if height < needed {
            return Err(PerfpaneError::surface(format!(
                "terminal too small: {} gauge rows need {needed} lines, have {height}",
                board.rows()
            )));
        }
        self.gauge_lines = board.lines();
        self.gauge_rows = board.rows();
        self.draw()
    }

    fn append_output(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.output.push(text);
        if self.active {
            self.draw()?;
        }
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        if self.alternate_screen {
            let _ = leave_alternate_screen(&mut io::stdout()).map_err(PerfpaneError::surface)?;
        } else {
            self.terminal.show_cursor().map_err(PerfpaneError::surface)?;
        }
        tracing::info!("render surface restored");
        Ok(())
    }
}

impl<B: Backend> Drop for TerminalSurface<B> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if self.alternate_screen {
            let _ = leave_alternate_screen(&mut io::stdout());
        } else {
            let _ = self.terminal.show_cursor();
        }
    }
}
