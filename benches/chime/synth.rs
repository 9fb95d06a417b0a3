//! Benchmarks for chime buffer synthesis.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use touch_chimes::ChimeSynth;

pub fn bench_synthesize(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth/chime");
    let mut synth = ChimeSynth::seeded(1);

    for &(rate, channels) in &[(44_100.0, 2usize), (48_000.0, 2), (48_000.0, 1)] {
        let label = format!("{}Hz_{}ch", rate as u32, channels);

        // Repeating note buffer
        group.bench_with_input(BenchmarkId::new("note_0.35s", &label), &rate, |b, &rate| {
            b.iter(|| synth.synthesize(black_box(0.35), rate, channels))
        });

        // Tap chime
        group.bench_with_input(BenchmarkId::new("tap_1.2s", &label), &rate, |b, &rate| {
            b.iter(|| synth.synthesize(black_box(1.2), rate, channels))
        });
    }

    group.finish();
}
