//! Benchmarks for forest training and raster classification

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geofuse_algorithms::classification::{ForestModel, ForestParams};
use geofuse_algorithms::sampling::{Sample, SampleSet};
use geofuse_core::{ClassSet, GeoTransform, GridSpec, Raster, RasterStack};

const BANDS: usize = 8;

fn feature(i: usize, band: usize) -> f64 {
    ((i * 31 + band * 17) % 97) as f64 / 97.0
}

fn create_samples(n: usize) -> SampleSet {
    let samples = (0..n)
        .map(|i| {
            let features: Vec<f64> = (0..BANDS).map(|b| feature(i, b)).collect();
            let label = if features[0] + features[3] > 1.0 { 2 } else { 1 };
            Sample::new(i, features, label)
        })
        .collect();
    let names = (0..BANDS).map(|b| format!("b{}", b)).collect();
    SampleSet::from_samples(names, samples).unwrap()
}

fn create_stack(size: usize) -> RasterStack {
    let grid = GridSpec::new(size, size, GeoTransform::new(0.0, size as f64, 1.0, -1.0), None);
    let mut stack = RasterStack::new(grid.clone());
    for b in 0..BANDS {
        let mut band = Raster::on_grid(&grid, 0.0);
        for row in 0..size {
            for col in 0..size {
                band.set(row, col, feature(row * size + col, b)).unwrap();
            }
        }
        stack.add_band(format!("b{}", b), band).unwrap();
    }
    stack
}

fn params(num_trees: usize) -> ForestParams {
    ForestParams {
        num_trees,
        seed: 7,
        ..Default::default()
    }
}

fn bench_train(c: &mut Criterion) {
    let classes = ClassSet::sequential(2).unwrap();
    let mut group = c.benchmark_group("forest/train");
    for n in [500, 2000] {
        let samples = create_samples(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| ForestModel::train(black_box(&samples), &classes, &params(100)).unwrap())
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classes = ClassSet::sequential(2).unwrap();
    let model = ForestModel::train(&create_samples(1000), &classes, &params(100)).unwrap();
    let mut group = c.benchmark_group("forest/classify_raster");
    for size in [128, 256] {
        let stack = create_stack(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| model.classify_raster(black_box(&stack)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_train, bench_classify);
criterion_main!(benches);
