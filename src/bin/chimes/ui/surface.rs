//! Touch surface widget: nodes, trails and bursts on a braille canvas

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as Segment, Points},
        Block, Borders,
    },
    Frame,
};

use touch_chimes::{ChimeScheduler, Point, TouchEffects};

use super::Surface;

/// Colour at `alpha` opacity over a black background.
fn faded(rgb: [u8; 3], alpha: f32) -> Color {
    let a = alpha.clamp(0.0, 1.0);
    Color::Rgb(
        (rgb[0] as f32 * a) as u8,
        (rgb[1] as f32 * a) as u8,
        (rgb[2] as f32 * a) as u8,
    )
}

pub fn render_surface(
    frame: &mut Frame,
    area: Rect,
    surface: &Surface,
    effects: &TouchEffects<ChimeScheduler>,
) {
    let player = effects.player();
    let scene = effects.scene();

    let mut status = vec![
        Span::raw(" chimes "),
        Span::styled(
            format!(" nodes {}/{} ", scene.len(), scene.config().max_nodes),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!(" notes {} ", player.active_notes()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            if player.is_continuous() {
                " ambient on "
            } else {
                " ambient off "
            },
            Style::default().fg(Color::Yellow),
        ),
    ];
    if player.is_silent() {
        status.push(Span::styled(" silent ", Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .title(Line::from(status))
        .borders(Borders::ALL);

    let drawn = effects.render();
    let (width, height) = surface.view_size();
    // Canvas y grows upwards, view y grows downwards
    let flip = |p: Point| (p.x as f64, (height - p.y) as f64);

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, width as f64])
        .y_bounds([0.0, height as f64])
        .paint(|ctx| {
            for trail in &drawn.trails {
                let (x1, y1) = flip(trail.from);
                let (x2, y2) = flip(trail.to);
                ctx.draw(&Segment {
                    x1,
                    y1,
                    x2,
                    y2,
                    color: faded(trail.rgb, trail.alpha * 0.5),
                });
            }
            for node in &drawn.nodes {
                let (x, y) = flip(node.center);
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: node.radius as f64,
                    color: faded(node.rgb, node.alpha),
                });
            }
            for burst in &drawn.bursts {
                let coords: Vec<(f64, f64)> = burst.iter().map(|&p| flip(p)).collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color: Color::White,
                });
            }
        });

    frame.render_widget(canvas, area);
}
