//! Terminal setup and teardown.
//!
//! Raw mode, alternate screen, hidden cursor and mouse reporting, undone in
//! reverse order when the [`TerminalSetup`] is dropped.

use std::io::{self, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::style::ResetColor;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, warn};

use crate::config::Config;
use crate::geometry::Size;

/// Terminal setup/teardown handle.
pub struct TerminalSetup {
    is_raw: bool,
    alternate_screen: bool,
    mouse_enabled: bool,
}

impl TerminalSetup {
    /// Enter raw mode and the features `config` asks for.
    pub fn enter(config: &Config) -> io::Result<Self> {
        let mut setup = Self {
            is_raw: false,
            alternate_screen: false,
            mouse_enabled: false,
        };
        terminal::enable_raw_mode()?;
        setup.is_raw = true;

        let mut out = io::stdout();
        if config.alternate_screen {
            execute!(out, EnterAlternateScreen)?;
            setup.alternate_screen = true;
        }
        execute!(out, Hide, Clear(ClearType::All))?;
        if config.mouse_capture {
            execute!(out, EnableMouseCapture)?;
            setup.mouse_enabled = true;
        }
        debug!(
            "terminal entered (alternate screen: {}, mouse: {})",
            setup.alternate_screen, setup.mouse_enabled
        );
        Ok(setup)
    }

    /// Restore the terminal. Called by `Drop`; safe to call twice.
    pub fn exit(&mut self) -> io::Result<()> {
        let mut out = io::stdout();
        if self.mouse_enabled {
            execute!(out, DisableMouseCapture)?;
            self.mouse_enabled = false;
        }
        execute!(out, ResetColor, Show)?;
        if self.alternate_screen {
            execute!(out, LeaveAlternateScreen)?;
            self.alternate_screen = false;
        }
        out.flush()?;
        if self.is_raw {
            terminal::disable_raw_mode()?;
            self.is_raw = false;
        }
        Ok(())
    }
}

impl Drop for TerminalSetup {
    fn drop(&mut self) {
        if let Err(err) = self.exit() {
            warn!("failed to restore terminal: {err}");
        }
    }
}

/// Current terminal size in cells.
pub fn terminal_size() -> io::Result<Size> {
    let (w, h) = terminal::size()?;
    Ok(Size::new(w as i32, h as i32))
}
