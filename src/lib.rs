pub mod config;
pub mod effect; // Touch → node + note coordination
pub mod engine; // Voice pool scheduling and audio output
pub mod error;
pub mod scene; // Decaying node field
pub mod synth; // Chime tone generation

pub use config::{ChimeConfig, SceneConfig};
pub use effect::{Frame, TouchEffects};
pub use engine::{ChimeScheduler, NotePlayer};
pub use error::{Error, Result};
pub use scene::{NodeId, NodeSimulation, Point};
pub use synth::{ChimeSynth, PcmBuffer};
