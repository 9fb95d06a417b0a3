//! Benchmarks for the audio-thread voice pool.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use rtrb::RingBuffer;
use touch_chimes::engine::voice::{VoiceCommand, VoiceMixer};
use touch_chimes::ChimeSynth;

use crate::BLOCK_SIZES;

pub fn bench_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer/pool4");
    let mut synth = ChimeSynth::seeded(2);

    for &size in BLOCK_SIZES {
        let (mut tx, rx) = RingBuffer::new(64);
        let (spent_tx, _spent) = RingBuffer::new(64);
        let mut mixer = VoiceMixer::new(4, rx, spent_tx);

        // All four voices busy with long tones, as under heavy touch input
        for voice in 0..4 {
            if let Ok(buffer) = synth.synthesize(30.0, 48_000.0, 2) {
                let _ = tx.push(VoiceCommand::Schedule { voice, buffer });
                let _ = tx.push(VoiceCommand::Play { voice });
            }
        }

        let mut out = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("stereo", size), &size, |b, _| {
            b.iter(|| mixer.render_block(black_box(&mut out), 2))
        });
    }

    group.finish();
}
