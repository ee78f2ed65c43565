use criterion::{black_box, criterion_group, criterion_main, Criterion};

use haptic_spike_audio::{HapticConfig, NullSink, PipelineCoordinator, PointerInput};

fn drag_ticks(c: &mut Criterion) {
    let mut pipeline = PipelineCoordinator::new(HapticConfig::default(), NullSink)
        .expect("default config is valid");
    pipeline.set_material(3).expect("wood is selector 3");

    // warm the sound cache so the loop measures steady state
    for i in 0..2_000 {
        pipeline.tick(PointerInput::new(i as f32, 0.0, true));
    }

    let mut x = 2_000.0_f32;
    c.bench_function("tick_while_dragging", |b| {
        b.iter(|| {
            x += 1.0;
            black_box(pipeline.tick(black_box(PointerInput::new(x, 0.0, true))))
        })
    });

    c.bench_function("tick_idle", |b| {
        b.iter(|| black_box(pipeline.tick(black_box(PointerInput::default()))))
    });
}

criterion_group!(benches, drag_ticks);
criterion_main!(benches);
