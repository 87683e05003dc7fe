//! Benchmarks pour l'agrégation zonale

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{polygon, MultiPolygon};
use ndarray::Array2;
use zonal::{aggregate_grid, Crs, GeoTransform, Grid, Statistic, ZonalOptions, ZoneSet};

/// Grille carrée de `size` cellules de 100 m
fn grid(size: usize) -> Grid<f32> {
    let band = Array2::from_shape_fn((size, size), |(r, c)| ((r * 31 + c * 17) % 400) as f32 / 10.0);
    Grid::from_band(
        band,
        GeoTransform::new(300_000.0, 6_300_000.0, 100.0, -100.0),
        Crs::Epsg(32719),
        None,
    )
    .unwrap()
}

/// Damier de `per_side` x `per_side` zones couvrant la grille
fn zones(size: usize, per_side: usize) -> ZoneSet {
    let step = size as f64 * 100.0 / per_side as f64;
    let mut geometries = Vec::with_capacity(per_side * per_side);
    for i in 0..per_side {
        for j in 0..per_side {
            let x0 = 300_000.0 + i as f64 * step;
            let y1 = 6_300_000.0 - j as f64 * step;
            let (x1, y0) = (x0 + step, y1 - step);
            let geometry = MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x1, y: y0),
                (x: x1, y: y1),
                (x: x0, y: y1),
                (x: x0, y: y0),
            ]]);
            geometries.push((geometry, HashMap::new()));
        }
    }
    ZoneSet::new(geometries, vec![], Crs::Epsg(32719))
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let options = ZonalOptions {
        stats: vec![
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::Std,
            Statistic::Median,
            Statistic::Percentile(90.0),
        ],
        all_touched: false,
    };

    for size in [256usize, 1024] {
        let grid = grid(size);
        let zones = zones(size, 8);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let stats = aggregate_grid(black_box(&zones), black_box(&grid), &options).unwrap();
                black_box(stats)
            })
        });
    }

    group.finish();
}

fn bench_all_touched(c: &mut Criterion) {
    let grid = grid(512);
    let zones = zones(512, 16);
    let options = ZonalOptions {
        all_touched: true,
        ..ZonalOptions::default()
    };

    c.bench_function("aggregate_all_touched_512", |b| {
        b.iter(|| {
            let stats = aggregate_grid(black_box(&zones), black_box(&grid), &options).unwrap();
            black_box(stats)
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_all_touched);
criterion_main!(benches);
