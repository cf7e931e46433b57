//! Clustering Benchmarks
//!
//! Run with: `cargo bench --bench clustering`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use scanlens_server::clustering::{cluster_lines, ClusteringConfig};
use scanlens_server::ocr::{BoundingBox, RawLine};

/// A page of vertical speech bubbles, `columns` lines each
fn synthetic_page(bubbles: usize, columns: usize) -> Vec<RawLine> {
    let mut lines = Vec::with_capacity(bubbles * columns);
    for b in 0..bubbles {
        let row = (b / 4) as f64;
        let col = (b % 4) as f64;
        let top = 0.02 + row * 0.12;
        let right = 0.95 - col * 0.22;
        for c in 0..columns {
            let x = right - (c as f64 + 1.0) * 0.025;
            lines.push(RawLine::new(
                format!("bubble{}-{}", b, c),
                BoundingBox::new(x, top, 0.02, 0.09),
            ));
        }
    }
    lines
}

fn bench_cluster_lines(c: &mut Criterion) {
    let config = ClusteringConfig::default();
    let mut group = c.benchmark_group("cluster_lines");

    for bubbles in [8usize, 32] {
        let lines = synthetic_page(bubbles, 3);
        group.bench_with_input(BenchmarkId::from_parameter(lines.len()), &lines, |b, lines| {
            b.iter(|| cluster_lines(black_box(lines), 1200, 1800, &config))
        });
    }

    // Long strip split into many clustering windows
    let tall = synthetic_page(32, 3);
    group.bench_function("tall_strip", |b| {
        b.iter(|| cluster_lines(black_box(&tall), 800, 20000, &config))
    });

    group.finish();
}

criterion_group!(benches, bench_cluster_lines);
criterion_main!(benches);
