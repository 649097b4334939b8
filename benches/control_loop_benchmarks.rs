//! Benchmarks for the per-sample decision path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use miyobi::{
    brightness::BrightnessBackend,
    distance::{find_distance, LandmarkPair, PinholeEstimator},
    policy::{decide, BrightnessLevel, BrightnessPolicy, BrightnessState},
    Result,
};
use opencv::core::Point2f;

struct NoopBackend;

impl BrightnessBackend for NoopBackend {
    fn current_brightness(&mut self) -> Result<BrightnessLevel> {
        Ok(BrightnessLevel::MAX)
    }

    fn apply(&mut self, _level: BrightnessLevel) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

fn benchmark_estimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimation");
    let estimator = PinholeEstimator::default();

    let pair = LandmarkPair::new(Point2f::new(100.0, 200.0), Point2f::new(226.0, 204.0));
    group.bench_function("find_distance", |b| {
        b.iter(|| black_box(find_distance(black_box(pair.left), black_box(pair.right))));
    });

    for width in [40.0, 126.0, 300.0] {
        group.bench_with_input(BenchmarkId::new("estimate", width), &width, |b, &width| {
            b.iter(|| black_box(estimator.estimate(black_box(width))));
        });
    }

    group.finish();
}

fn benchmark_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy");
    let close = BrightnessLevel::saturating(1);
    let normal = BrightnessLevel::saturating(80);

    group.bench_function("decide", |b| {
        b.iter(|| black_box(decide(black_box(38.5), 45.0, close, normal)));
    });

    // Alternating distances force a backend call on every sample
    let distances: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 30.0 } else { 60.0 }).collect();
    for (name, debounce) in [("debounced", true), ("always_apply", false)] {
        let policy = BrightnessPolicy::new(45.0, close, normal).with_debounce(debounce);
        group.bench_with_input(BenchmarkId::new("apply_sequence", name), &distances, |b, distances| {
            b.iter(|| {
                let mut state = BrightnessState::new();
                let mut backend = NoopBackend;
                for &distance in distances {
                    let _ = black_box(policy.apply(distance, &mut state, &mut backend));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_estimation, benchmark_policy);
criterion_main!(benches);
