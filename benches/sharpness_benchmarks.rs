//! Performance benchmarks for sharpness scoring and frame handling
//!
//! Run with: cargo bench
//!
//! Scoring runs once per capture on the blocking pool; frame handling runs
//! for every detector result, so both are tracked for regressions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eyecapture::config::CaptureParameters;
use eyecapture::orchestrator::{CaptureOrchestrator, Event};
use eyecapture::quality::laplacian_sharpness;
use eyecapture::testing::{checkerboard, SyntheticFace};
use eyecapture::types::{Eye, Viewport};
use std::time::Duration;

fn bench_laplacian(c: &mut Criterion) {
    let mut group = c.benchmark_group("Laplacian Sharpness");
    group.measurement_time(Duration::from_secs(10));

    for &(width, height, name) in &[
        (640u32, 480u32, "VGA"),
        (1920, 1080, "1080p"),
        (4032, 3024, "12MP"),
    ] {
        let image = checkerboard(width, height, 8);
        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_with_input(BenchmarkId::new("score", name), &image, |b, img| {
            b.iter(|| laplacian_sharpness(black_box(img)))
        });
    }

    group.finish();
}

fn bench_frame_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Frame Handling");
    let frame = SyntheticFace::centered_on(Eye::Right)
        .shifted(0.2, 0.0)
        .frame(640, 480);

    group.bench_function("off_center_frame", |b| {
        let mut orchestrator = CaptureOrchestrator::new(
            CaptureParameters::default(),
            Viewport::default(),
            8.0,
            "bench",
        );
        orchestrator.handle(Event::Start { participant: None });
        b.iter(|| orchestrator.handle(Event::Frame(black_box(frame.clone()))))
    });

    group.finish();
}

criterion_group!(benches, bench_laplacian, bench_frame_handling);
criterion_main!(benches);
