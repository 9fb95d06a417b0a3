// Purpose: procedural chime tones and the PCM buffers that carry them

pub mod buffer;
pub mod chime;

pub use buffer::PcmBuffer;
pub use chime::{ChimeParams, ChimeSynth};
