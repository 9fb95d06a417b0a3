//! Tunables for the chime engine and the node field.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Audio-side configuration for [`ChimeScheduler`](crate::engine::ChimeScheduler).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChimeConfig {
    /// Number of playback voices in the round-robin pool
    pub pool_size: usize,
    /// Seconds between repeats of a per-node note (and the ambient chime)
    pub note_interval: f64,
    /// Length of each repeating note buffer in seconds
    pub note_duration: f64,
    /// Length of a tap chime in seconds
    pub one_shot_duration: f64,
    /// Capacity of the worker → scheduling thread buffer ring
    pub handoff_capacity: usize,
    /// Fixed RNG seed for reproducible tones; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            note_interval: 0.18,
            note_duration: 0.35,
            one_shot_duration: 1.2,
            handoff_capacity: 64,
            seed: None,
        }
    }
}

impl ChimeConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_note_interval(mut self, seconds: f64) -> Self {
        self.note_interval = seconds;
        self
    }

    pub fn with_note_duration(mut self, seconds: f64) -> Self {
        self.note_duration = seconds;
        self
    }

    pub fn with_one_shot_duration(mut self, seconds: f64) -> Self {
        self.one_shot_duration = seconds;
        self
    }

    pub fn with_handoff_capacity(mut self, capacity: usize) -> Self {
        self.handoff_capacity = capacity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject values that would make the scheduler spin or divide by zero.
    pub fn validate(&self) -> Result<()> {
        positive("pool_size", self.pool_size as f64)?;
        positive("note_interval", self.note_interval)?;
        positive("note_duration", self.note_duration)?;
        positive("one_shot_duration", self.one_shot_duration)?;
        positive("handoff_capacity", self.handoff_capacity as f64)?;
        Ok(())
    }
}

/// Simulation-side configuration for [`NodeSimulation`](crate::scene::NodeSimulation).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Hard cap on live nodes; the oldest surplus is evicted each tick
    pub max_nodes: usize,
    /// Life lost per second (life starts at 1.0)
    pub decay_rate: f32,
    /// Lower bound of the randomized base radius
    pub min_radius: f32,
    /// Upper bound (exclusive) of the randomized base radius
    pub max_radius: f32,
    /// How long a touch burst stays visible, in seconds
    pub burst_duration: f64,
    /// Fixed RNG seed for node styling; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_nodes: 60,
            decay_rate: 0.6,
            min_radius: 6.0,
            max_radius: 14.0,
            burst_duration: 0.06,
            seed: None,
        }
    }
}

impl SceneConfig {
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn with_decay_rate(mut self, decay_rate: f32) -> Self {
        self.decay_rate = decay_rate;
        self
    }

    pub fn with_radius_range(mut self, min: f32, max: f32) -> Self {
        self.min_radius = min;
        self.max_radius = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        positive("max_nodes", self.max_nodes as f64)?;
        positive("decay_rate", self.decay_rate as f64)?;
        positive("min_radius", self.min_radius as f64)?;
        positive("burst_duration", self.burst_duration)?;
        if self.max_radius <= self.min_radius {
            return Err(Error::invalid("max_radius", self.max_radius as f64));
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, value))
    }
}
