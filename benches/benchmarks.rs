use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pmodel_calib::density;
use pmodel_calib::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub fn prior_benchmark(c: &mut Criterion) {
    let (settings, _) = Setup::S2.settings().unwrap();
    c.bench_function("sample_prior_10000", |b| {
        let mut rng = StdRng::seed_from_u64(1004);
        b.iter(|| settings.sample_prior(black_box(density::PRIOR_DRAWS), &mut rng).unwrap())
    });
}

pub fn density_benchmark(c: &mut Criterion) {
    let (settings, _) = Setup::S1.settings().unwrap();
    let mut rng = StdRng::seed_from_u64(1004);
    let posterior = settings.sample_prior(120_000, &mut rng).unwrap();
    let prior = settings.sample_prior(density::PRIOR_DRAWS, &mut rng).unwrap();
    let rows = density::tidy(&posterior, &prior).unwrap();
    c.bench_function("densities_s1", |b| {
        b.iter(|| density::densities(black_box(&rows), density::GRID))
    });
}

criterion_group!(benches, prior_benchmark, density_benchmark);
criterion_main!(benches);
