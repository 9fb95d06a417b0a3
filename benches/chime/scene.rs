//! Benchmarks for the node field at its population cap.

use std::hint::black_box;

use criterion::Criterion;
use touch_chimes::scene::render;
use touch_chimes::{NodeSimulation, Point, SceneConfig};

fn full_scene() -> NodeSimulation {
    // Slow decay so nothing expires mid-benchmark
    let config = SceneConfig::default().with_decay_rate(1e-6).with_seed(3);
    let mut sim = NodeSimulation::new(config).expect("valid scene config");
    for i in 0..60 {
        sim.add_node(Point::new(i as f32 * 5.0, 100.0));
    }
    sim
}

pub fn bench_scene(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene");

    let mut sim = full_scene();
    group.bench_function("tick_60", |b| {
        b.iter(|| {
            // Keep the population at the cap so every tick evicts
            sim.add_node(Point::new(0.0, 0.0));
            sim.tick(black_box(1.0 / 30.0))
        })
    });

    let sim = full_scene();
    group.bench_function("layout_60", |b| {
        b.iter(|| {
            let nodes = render::layout(sim.snapshot(), black_box(1.5));
            render::trails(&nodes)
        })
    });

    group.finish();
}
