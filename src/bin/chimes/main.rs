//! chimes - touch-surface wind chimes in the terminal
//!
//! Run with: cargo run --bin chimes 2>chimes.log
//!
//! Click or drag on the surface to spawn nodes; each one rings until it
//! fades. Logs go to stderr so they stay out of the TUI.

mod app;
mod ui;

use std::io::stdout;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
};

use app::ChimesApp;
use touch_chimes::{ChimeConfig, SceneConfig};

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut app = ChimesApp::new(SceneConfig::default(), ChimeConfig::default())
        .wrap_err("failed to set up chimes")?;

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture).wrap_err("failed to enable mouse capture")?;

    let res = app.run(&mut terminal);

    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    res
}
