// Purpose: voice pool scheduling, background synthesis, audio output

pub mod output;
pub mod scheduler;
pub mod timer;
pub mod voice;
pub mod worker;

pub use output::{CpalOutput, OutputFormat, PlaybackSink};
pub use scheduler::{ChimeScheduler, NotePlayer};
pub use worker::{RenderedChime, TimerKey};
