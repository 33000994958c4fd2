use std::{hint::black_box, sync::atomic::AtomicU32};

use criterion::{Criterion, criterion_group, criterion_main};
use cubic_downsample::util::{atomic_add_f32, dot::weighted_sum};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

pub fn bench_weighted_sum_16(c: &mut Criterion) {
    c.bench_function("weighted_sum 16 taps", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let weights: Vec<f32> = (0..16).map(|_| rng.random()).collect();
        let taps: Vec<f32> = (0..16).map(|_| rng.random()).collect();

        b.iter(|| weighted_sum(black_box(&weights), black_box(&taps)))
    });
}

pub fn bench_weighted_sum_64(c: &mut Criterion) {
    c.bench_function("weighted_sum 64 taps", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let weights: Vec<f32> = (0..64).map(|_| rng.random()).collect();
        let taps: Vec<f32> = (0..64).map(|_| rng.random()).collect();

        b.iter(|| weighted_sum(black_box(&weights), black_box(&taps)))
    });
}

pub fn bench_atomic_add_f32(c: &mut Criterion) {
    c.bench_function("atomic_add_f32 uncontended", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let cell = AtomicU32::new(0f32.to_bits());
        let value: f32 = rng.random();

        b.iter(|| atomic_add_f32(black_box(&cell), black_box(value)))
    });
}

criterion_group!(
    benches,
    bench_weighted_sum_16,
    bench_weighted_sum_64,
    bench_atomic_add_f32
);
criterion_main!(benches);
