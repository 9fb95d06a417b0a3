//! Presentation-only math: jitter, growth, colour, trails, bursts.
//!
//! Nothing here writes back into the simulation. Callers pass a clock
//! (`time`, seconds since start) and get drawable values out.

use std::f32::consts::TAU;

use crate::scene::node::{Node, NodeId, Point};

/// How much a node grows by the time its life reaches zero.
const GROWTH: f32 = 0.8;
/// Jitter angular speed (rad/s) and per-node phase spread.
const JITTER_RATE: f64 = 6.0;
const JITTER_PHASE: f64 = 10.0;
/// Horizontal jitter amplitude at full life; vertical is half.
const JITTER_AMPLITUDE: f32 = 8.0;

pub const BURST_PARTICLES: usize = 8;
const BURST_REACH: f32 = 30.0;

/// A node ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawNode {
    pub id: NodeId,
    pub center: Point,
    pub radius: f32,
    pub rgb: [u8; 3],
    /// Opacity, equal to the node's remaining life
    pub alpha: f32,
}

/// A line joining two consecutive nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: Point,
    pub to: Point,
    pub rgb: [u8; 3],
    pub alpha: f32,
}

/// Radius as drawn: grows up to 1.8x as life drains.
pub fn display_radius(node: &Node) -> f32 {
    node.radius * (1.0 + (1.0 - node.life) * GROWTH)
}

/// Offset added to a node's position when drawn at `time`.
pub fn jitter(node: &Node, time: f64) -> (f32, f32) {
    // Phase in f64 so long sessions keep their resolution
    let phase = time * JITTER_RATE + node.seed as f64 * JITTER_PHASE;
    let wobble = phase.sin() as f32;
    let dx = wobble * JITTER_AMPLITUDE * node.life;
    (dx, dx * 0.5)
}

/// HSV (h in degrees, s and v in [0, 1]) to 8-bit RGB.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = value * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}

pub fn layout_node(node: &Node, time: f64) -> DrawNode {
    let (dx, dy) = jitter(node, time);
    DrawNode {
        id: node.id,
        center: Point::new(node.position.x + dx, node.position.y + dy),
        radius: display_radius(node),
        rgb: hsv_to_rgb(node.hue, 1.0, 1.0),
        alpha: node.life,
    }
}

/// Lay out a snapshot (oldest first) at `time`.
pub fn layout<'a>(nodes: impl IntoIterator<Item = &'a Node>, time: f64) -> Vec<DrawNode> {
    nodes.into_iter().map(|n| layout_node(n, time)).collect()
}

/// Trails between each node and the next newer one.
///
/// A segment takes the newer node's colour and the fainter of the two
/// opacities.
pub fn trails(nodes: &[DrawNode]) -> Vec<TrailSegment> {
    nodes
        .windows(2)
        .map(|pair| TrailSegment {
            from: pair[0].center,
            to: pair[1].center,
            rgb: pair[1].rgb,
            alpha: pair[0].alpha.min(pair[1].alpha),
        })
        .collect()
}

/// Particle positions of a burst `progress` (0..=1) through its lifetime.
pub fn burst_particles(origin: Point, progress: f32) -> [Point; BURST_PARTICLES] {
    let reach = BURST_REACH * progress.clamp(0.0, 1.0);
    std::array::from_fn(|i| {
        let angle = TAU * i as f32 / BURST_PARTICLES as f32;
        Point::new(origin.x + reach * angle.cos(), origin.y + reach * angle.sin())
    })
}
