//! benches/bench.rs
//! • Run with:  `cargo bench`

use _grouplasso_impl::penalty::compute_penalty_dense;
use _grouplasso_impl::solver::{
    never_interrupt, solve, solve_multi_response, update_residual, GroupPartition,
    MultiResponseStateBuilder, SolverStateBuilder,
};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};

// -------------------------------------------------------------
// Problem setup: columns orthonormal within each group
// -------------------------------------------------------------
fn orthonormal_design(rng: &mut rand::rngs::StdRng, n: usize, partition: &GroupPartition) -> Array2<f64> {
    let mut x = Array2::from_shape_fn((n, partition.n_features()), |_| rng.gen_range(-1.0..1.0));
    for (start, size) in partition.iter() {
        for j in start..start + size {
            for prev in start..j {
                let proj = x.column(j).dot(&x.column(prev));
                let prev_col = x.column(prev).to_owned();
                x.column_mut(j).scaled_add(-proj, &prev_col);
            }
            let norm: f64 = x.column(j).dot(&x.column(j));
            let norm = norm.sqrt();
            x.column_mut(j).mapv_inplace(|v| v / norm);
        }
    }
    x
}

fn lambda_path(x: &Array2<f64>, y: &Array1<f64>, partition: &GroupPartition, n_lmdas: usize) -> Vec<f64> {
    let grad = x.t().dot(y);
    let lmda_max = partition
        .iter()
        .map(|(start, size)| grad.slice(ndarray::s![start..start + size]).mapv(|g| g * g).sum().sqrt())
        .fold(0.0, f64::max);
    let step = 0.01f64.powf(1.0 / (n_lmdas - 1) as f64);
    (0..n_lmdas).map(|i| lmda_max * step.powi(i as i32)).collect()
}

// -------------------------------------------------------------
// Criterion benchmarks – sample_size(10) for quick runs
// -------------------------------------------------------------
fn bench_gaussian_path(c: &mut Criterion) {
    const N: usize = 2_000;
    const SEED: u64 = 0x5eed;

    let mut rng = rand::rngs::StdRng::seed_from_u64(SEED);
    let sizes: Vec<usize> = (0..100).map(|g| 1 + g % 5).collect();
    let partition = GroupPartition::from_sizes(&sizes).unwrap();
    let x = orthonormal_design(&mut rng, N, &partition);
    let beta = Array1::from_shape_fn(partition.n_features(), |j| if j % 7 == 0 { 1.0 } else { 0.0 });
    let y = x.dot(&beta) + Array1::from_shape_fn(N, |_| rng.gen_range(-0.1..0.1));
    let lmdas = lambda_path(&x, &y, &partition, 50);

    let mut group = c.benchmark_group("solver");
    group.sample_size(10);
    group.bench_function("gaussian_path", |b| {
        b.iter(|| {
            let mut state = SolverStateBuilder::new(&x, partition.clone())
                .lmdas(lmdas.clone())
                .response(y.view())
                .build()
                .unwrap();
            solve(&mut state, false, update_residual, never_interrupt).unwrap();
            std::hint::black_box(state.betas().len());
        });
    });

    let y_multi = Array2::from_shape_fn((N, 3), |(i, k)| y[i] * (k as f64 + 1.0));
    group.bench_function("multigaussian_path", |b| {
        b.iter(|| {
            let mut state = MultiResponseStateBuilder::new(&x, partition.clone(), y_multi.view())
                .lmdas(lmdas.clone())
                .build()
                .unwrap();
            solve_multi_response(&mut state, false, update_residual, never_interrupt).unwrap();
            std::hint::black_box(state.intercepts().nrows());
        });
    });
    group.finish();
}

fn bench_penalty(c: &mut Criterion) {
    const ROWS: usize = 20_000;
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let sizes: Vec<usize> = (0..200).map(|g| 1 + g % 4).collect();
    let partition = GroupPartition::from_sizes(&sizes).unwrap();
    let penalty = vec![1.0; partition.n_groups()];
    let betas = Array2::from_shape_fn((ROWS, partition.n_features()), |_| rng.gen_range(-1.0..1.0));

    let mut group = c.benchmark_group("penalty");
    group.sample_size(10);
    for n_threads in [1, 4] {
        group.bench_function(format!("dense_{n_threads}_threads"), |b| {
            b.iter(|| {
                let out = compute_penalty_dense(betas.view(), &partition, &penalty, 0.9, n_threads).unwrap();
                std::hint::black_box(out);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gaussian_path, bench_penalty);
criterion_main!(benches);
