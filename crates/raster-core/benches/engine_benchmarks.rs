//! Benchmarks for the raster engines.
//!
//! Run with: cargo bench --package raster-core --bench engine_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use raster_core::{
    polygon_from_rings, EngineConfig, Extent, ExtractEngine, ExtractOptions, FocalEngine,
    FocalOptions, GeoProvider, RasterImage, RasterizeEngine, RasterizeOptions, Reducer,
};
use test_utils::{create_gradient_grid, fixtures::rings};

fn gradient_image(size: usize) -> RasterImage {
    RasterImage::from_array(
        create_gradient_grid(size, size, 0.0, 100.0),
        size,
        size,
        Extent::new(0.0, size as f64, 0.0, size as f64),
        None,
        None,
    )
    .unwrap()
}

/// A regular lattice of `n x n` square polygons covering the grid.
fn polygon_lattice(size: usize, n: usize) -> Vec<geo::MultiPolygon<f64>> {
    let step = size as f64 / n as f64;
    (0..n * n)
        .map(|i| {
            let x = (i % n) as f64 * step;
            let y = (i / n) as f64 * step;
            polygon_from_rings(&rings::rect(x, y, x + step, y + step), &[])
        })
        .collect()
}

// =============================================================================
// FOCAL BENCHMARKS
// =============================================================================

fn bench_focal(c: &mut Criterion) {
    let mut group = c.benchmark_group("focal");
    let engine = FocalEngine::default();

    for size in [256, 1024] {
        let image = gradient_image(size);
        group.throughput(Throughput::Elements((size * size) as u64));

        for (window, reducer) in [(3, Reducer::Mean), (7, Reducer::Mean), (3, Reducer::Median)] {
            let options = FocalOptions::new(window, window, reducer.clone());
            group.bench_with_input(
                BenchmarkId::new(format!("{}_{}x{}", reducer, window, window), size),
                &image,
                |b, image| b.iter(|| engine.apply(black_box(image), &options).unwrap()),
            );
        }
    }

    group.finish();
}

// =============================================================================
// AGGREGATE / CROP BENCHMARKS
// =============================================================================

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let image = gradient_image(2048);
    group.throughput(Throughput::Elements((2048 * 2048) as u64));

    for factor in [2, 8] {
        group.bench_with_input(BenchmarkId::new("sum", factor), &factor, |b, &factor| {
            b.iter(|| image.aggregate(factor, factor, &Reducer::Sum).unwrap())
        });
    }

    group.bench_function("crop_quarter", |b| {
        let extent = Extent::new(512.0, 1536.0, 512.0, 1536.0);
        b.iter(|| image.crop(black_box(&extent)).unwrap())
    });

    group.finish();
}

// =============================================================================
// POLYGON BENCHMARKS
// =============================================================================

fn bench_polygons(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygons");
    let config = EngineConfig::default();
    let rasterize = RasterizeEngine::new(GeoProvider, &config).unwrap();
    let extract = ExtractEngine::new(GeoProvider, &config).unwrap();
    let image = gradient_image(512);

    for n in [4, 32] {
        let polygons = polygon_lattice(512, n);
        group.throughput(Throughput::Elements(polygons.len() as u64));

        group.bench_with_input(BenchmarkId::new("rasterize", n * n), &polygons, |b, polygons| {
            b.iter(|| {
                let mut target = image.clone();
                rasterize
                    .rasterize(&mut target, polygons, &RasterizeOptions::default())
                    .unwrap()
            })
        });

        let options = ExtractOptions::new(Reducer::Mean);
        group.bench_with_input(BenchmarkId::new("extract_mean", n * n), &polygons, |b, polygons| {
            b.iter(|| extract.extract(black_box(&image), polygons, &options).unwrap())
        });

        let weighted = ExtractOptions::new(Reducer::Mean).weighted();
        group.bench_with_input(
            BenchmarkId::new("extract_weighted", n * n),
            &polygons,
            |b, polygons| b.iter(|| extract.extract(black_box(&image), polygons, &weighted).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_focal, bench_aggregate, bench_polygons);
criterion_main!(benches);
