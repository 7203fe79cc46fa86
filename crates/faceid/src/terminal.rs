//! Raw-mode terminal setup with restore on every exit path.

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io::{self, Stdout};

/// Runs `restore` when dropped, including on early `?` returns.
pub struct RestoreGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> RestoreGuard<F> {
    pub fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for RestoreGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

/// Enter raw mode and the alternate screen. The returned guard undoes both
/// when dropped, even if building the terminal fails after raw mode is on.
pub fn enter() -> io::Result<(Terminal<CrosstermBackend<Stdout>>, RestoreGuard<fn()>)> {
    enable_raw_mode()?;
    let guard = RestoreGuard::new(restore as fn());

    execute!(io::stdout(), EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    Ok((terminal, guard))
}

fn restore() {
    if let Err(e) = disable_raw_mode() {
        tracing::warn!(error = %e, "failed to leave raw mode");
    }
    if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show) {
        tracing::warn!(error = %e, "failed to leave alternate screen");
    }
}
