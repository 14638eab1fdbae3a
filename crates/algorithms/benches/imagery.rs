//! Index and compositing throughput on synthetic scenes

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geofuse_algorithms::compositing::composite;
use geofuse_algorithms::imagery::{band_math_binary, ndvi, BandMathOp};
use geofuse_algorithms::reducer::Reducer;
use geofuse_core::{GeoTransform, Raster, RasterCollection, RasterStack};

/// Square band with a deterministic speckle pattern around `level`
fn scene_band(size: usize, level: f64, spread: f64) -> Raster<f64> {
    let values = (0..size * size)
        .map(|i| level + spread * (((i * 7919) % 1000) as f64 / 1000.0 - 0.5))
        .collect();
    let mut band = Raster::from_vec(values, size, size).unwrap();
    band.set_transform(GeoTransform::new(0.0, 10.0 * size as f64, 10.0, -10.0));
    band
}

fn bench_ndvi(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/ndvi");
    for size in [256, 1024, 2048] {
        let nir = scene_band(size, 0.35, 0.2);
        let red = scene_band(size, 0.08, 0.05);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ndvi(black_box(&nir), black_box(&red)).unwrap())
        });
    }
    group.finish();
}

fn bench_backscatter_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("imagery/vv_vh_difference");
    for size in [256, 1024, 2048] {
        let vv = scene_band(size, -11.0, 6.0);
        let vh = scene_band(size, -18.0, 6.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| band_math_binary(black_box(&vv), black_box(&vh), BandMathOp::Subtract).unwrap())
        });
    }
    group.finish();
}

fn bench_monthly_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositing/median_12_scenes");
    for size in [256, 512] {
        let grid = scene_band(size, 0.0, 0.0).grid_spec();
        let mut collection = RasterCollection::new(["VV"], grid);
        for month in 1..=12u32 {
            let date = NaiveDate::from_ymd_opt(2022, month, 15).unwrap();
            let stack =
                RasterStack::from_bands([("VV", scene_band(size, -12.0 + month as f64 * 0.1, 6.0))]).unwrap();
            collection.push(date, stack).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| composite(black_box(&collection), Reducer::Median).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ndvi, bench_backscatter_ratio, bench_monthly_median);
criterion_main!(benches);
