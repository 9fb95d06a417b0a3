mod mixer;
mod scene;
mod synth;

pub use mixer::bench_mixer;
pub use scene::bench_scene;
pub use synth::bench_synthesize;
