//! Effect coordinator: ties touch nodes to chime notes.
//!
//! Every `begin_effect` spawns a node, starts a note keyed by the node's id
//! and fires a short particle burst. Every tick decays the nodes and stops
//! the note of each node that went away, exactly once.

use std::time::Instant;

use crate::config::{ChimeConfig, SceneConfig};
use crate::engine::{ChimeScheduler, NotePlayer};
use crate::error::Result;
use crate::scene::render::{self, DrawNode, TrailSegment, BURST_PARTICLES};
use crate::scene::{NodeId, NodeSimulation, Point};

/// A one-shot decorative burst at a touch point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    pub origin: Point,
    /// Seconds since the touch
    pub age: f64,
}

/// Everything the host needs to draw one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub nodes: Vec<DrawNode>,
    pub trails: Vec<TrailSegment>,
    pub bursts: Vec<[Point; BURST_PARTICLES]>,
}

pub struct TouchEffects<P: NotePlayer> {
    scene: NodeSimulation,
    player: P,
    bursts: Vec<Burst>,
    /// Seconds of simulated time, used as the render clock
    time: f64,
    last_frame: Option<Instant>,
}

impl TouchEffects<ChimeScheduler> {
    /// Coordinator over the default audio device, silent if it is missing.
    pub fn with_default_output(scene: SceneConfig, audio: ChimeConfig) -> Result<Self> {
        Ok(Self::new(
            NodeSimulation::new(scene)?,
            ChimeScheduler::with_default_output(audio),
        ))
    }
}

impl<P: NotePlayer> TouchEffects<P> {
    pub fn new(scene: NodeSimulation, player: P) -> Self {
        Self {
            scene,
            player,
            bursts: Vec::new(),
            time: 0.0,
            last_frame: None,
        }
    }

    /// Touch down or move at `point`. No debouncing.
    pub fn begin_effect(&mut self, point: impl Into<Point>) -> NodeId {
        let point = point.into();
        let id = self.scene.add_node(point);
        self.player.start_note(id, None);
        self.bursts.push(Burst {
            origin: point,
            age: 0.0,
        });
        id
    }

    /// Advance by `dt` seconds. Returns the ids whose notes were stopped.
    pub fn tick(&mut self, dt: f64) -> Vec<NodeId> {
        let removed = self.scene.tick(dt as f32);
        for &id in &removed {
            self.player.stop_note(id);
        }

        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
            let window = self.scene.config().burst_duration;
            for burst in &mut self.bursts {
                burst.age += dt;
            }
            self.bursts.retain(|b| b.age < window);
        } else {
            tracing::trace!(dt, "non-positive frame delta, nothing decayed");
        }

        self.player.pump();
        removed
    }

    /// Advance to wall-clock `now`. The first call only sets the reference
    /// point and decays nothing.
    pub fn frame(&mut self, now: Instant) -> Vec<NodeId> {
        let dt = match self.last_frame.replace(now) {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => 0.0,
        };
        self.tick(dt)
    }

    /// Drawable state at the current render clock.
    pub fn render(&self) -> Frame {
        let nodes = render::layout(self.scene.snapshot(), self.time);
        let trails = render::trails(&nodes);
        let window = self.scene.config().burst_duration;
        let bursts = self
            .bursts
            .iter()
            .map(|b| render::burst_particles(b.origin, (b.age / window) as f32))
            .collect();

        Frame {
            nodes,
            trails,
            bursts,
        }
    }

    pub fn scene(&self) -> &NodeSimulation {
        &self.scene
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    /// Render clock in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }
}
