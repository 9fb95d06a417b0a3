//! TUI module for chimes
//!
//! A touch surface on top, oscilloscope and spectrum of the live mix below.

mod scope;
pub mod spectrum;
mod surface;

use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use touch_chimes::{ChimeScheduler, Point, TouchEffects};

use scope::render_scope;
use spectrum::render_spectrum;
use surface::render_surface;

/// View-space size of one terminal cell. Cells are roughly twice as tall
/// as they are wide.
pub const CELL_WIDTH: f32 = 8.0;
pub const CELL_HEIGHT: f32 = 16.0;

/// Screen areas for one frame.
pub struct Panes {
    pub surface: Rect,
    pub scope: Rect,
    pub spectrum: Rect,
    pub help: Rect,
}

impl Panes {
    pub fn split(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),   // Touch surface
                Constraint::Length(9), // Scope + spectrum
                Constraint::Length(1), // Help bar
            ])
            .split(area);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        Self {
            surface: rows[0],
            scope: bottom[0],
            spectrum: bottom[1],
            help: rows[2],
        }
    }
}

/// The drawable interior of the touch surface and its view-space mapping.
pub struct Surface {
    inner: Rect,
}

impl Surface {
    /// `outer` is the bordered pane; the border is not touchable.
    pub fn new(outer: Rect) -> Self {
        Self {
            inner: outer.inner(Margin::new(1, 1)),
        }
    }

    pub fn area(&self) -> Rect {
        self.inner
    }

    /// Width and height in view units.
    pub fn view_size(&self) -> (f32, f32) {
        (
            self.inner.width as f32 * CELL_WIDTH,
            self.inner.height as f32 * CELL_HEIGHT,
        )
    }

    /// Touch point for a terminal cell, if it lies on the surface.
    pub fn to_view(&self, column: u16, row: u16) -> Option<Point> {
        let area = self.inner;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        // Cell centre
        Some(Point::new(
            (column - area.x) as f32 * CELL_WIDTH + CELL_WIDTH / 2.0,
            (row - area.y) as f32 * CELL_HEIGHT + CELL_HEIGHT / 2.0,
        ))
    }
}

/// Draw one frame.
pub fn render(
    frame: &mut Frame,
    panes: &Panes,
    surface: &Surface,
    effects: &TouchEffects<ChimeScheduler>,
    audio_buffer: &[f32],
    spectrum: &[(f64, f64)],
) {
    render_surface(frame, panes.surface, surface, effects);
    render_scope(frame, panes.scope, audio_buffer);
    render_spectrum(frame, panes.spectrum, spectrum);

    let help = Paragraph::new(
        " [Click/Drag] Chime  [Right click/Space] Tap  [C] Ambient  [Q] Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, panes.help);
}
