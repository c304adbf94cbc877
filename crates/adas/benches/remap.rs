use adas::{filter_and_remap, BoundingBox, Detection, FrameTransform, ProximityHeuristic};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_filter_and_evaluate(c: &mut Criterion) {
    let transform = FrameTransform::for_detector(640, 480, 300, 90, false).unwrap();
    let heuristic = ProximityHeuristic::default();
    let detections: Vec<Detection> = (0..10)
        .map(|i| {
            let offset = i as f32 * 20.0;
            Detection::new(
                if i % 2 == 0 { "car" } else { "person" },
                0.3 + i as f32 * 0.07,
                Some(BoundingBox::new(offset, offset, offset + 120.0, offset + 80.0)),
            )
        })
        .collect();

    c.bench_function("filter_remap_evaluate_10", |b| {
        b.iter(|| {
            let mapped = filter_and_remap(black_box(detections.clone()), 0.5, &transform);
            mapped
                .iter()
                .filter(|d| heuristic.evaluate(d).too_close)
                .count()
        })
    });
}

criterion_group!(benches, bench_filter_and_evaluate);
criterion_main!(benches);
