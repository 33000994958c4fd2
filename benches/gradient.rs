use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use cubic_downsample::{GradientOperator, GradientOperator3DX, GradientOperator3DZ, LinearOperator};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

pub fn bench_gradient_1d(c: &mut Criterion) {
    c.bench_function("GradientOperator rmatvec 1M", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let op = GradientOperator::<f32>::new(1 << 20).unwrap();
        let y = Array1::from_shape_simple_fn(op.shape().0, || rng.random::<f32>());

        b.iter(|| op.rmatvec(black_box(y.view())).unwrap())
    });
}

pub fn bench_gradient_3d_x(c: &mut Criterion) {
    c.bench_function("GradientOperator3DX matvec 128^3", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let op = GradientOperator3DX::<f32>::new([128, 128, 128]).unwrap();
        let x = Array1::from_shape_simple_fn(op.shape().1, || rng.random::<f32>());

        b.iter(|| op.matvec(black_box(x.view())).unwrap())
    });
}

pub fn bench_gradient_3d_z(c: &mut Criterion) {
    c.bench_function("GradientOperator3DZ rmatvec 128^3", |b| {
        let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
        let op = GradientOperator3DZ::<f32>::new([128, 128, 128]).unwrap();
        let y = Array1::from_shape_simple_fn(op.shape().0, || rng.random::<f32>());

        b.iter(|| op.rmatvec(black_box(y.view())).unwrap())
    });
}

criterion_group!(benches, bench_gradient_1d, bench_gradient_3d_x, bench_gradient_3d_z);
criterion_main!(benches);
