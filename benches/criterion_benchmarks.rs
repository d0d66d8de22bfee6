use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::DMatrix;

use minigrad::{no_grad, topological_sort, Scalar, Tensor};

// =============================================================================
// SCALAR BENCHMARKS
// =============================================================================

fn scalar_forward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/forward_chain");

  for chain_len in [10, 50, 100, 500, 1000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          let mut x = Scalar::new(black_box(0.5));
          for _ in 0..len {
            x = (&x * &x + 1.0).tanh();
          }
          black_box(*x.data())
        });
      },
    );
  }
  group.finish();
}

fn scalar_forward_chain_no_grad(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/forward_chain_no_grad");

  for chain_len in [10, 100, 1000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          no_grad(|| {
            let mut x = Scalar::new(black_box(0.5));
            for _ in 0..len {
              x = (&x * &x + 1.0).tanh();
            }
            black_box(*x.data())
          })
        });
      },
    );
  }
  group.finish();
}

fn scalar_backward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/backward_chain");

  for chain_len in [10, 50, 100, 500, 1000] {
    group.throughput(Throughput::Elements(chain_len as u64));
    group.bench_with_input(
      BenchmarkId::from_parameter(chain_len),
      &chain_len,
      |b, &len| {
        b.iter(|| {
          let x = Scalar::new(black_box(0.5));
          let mut result = &x * 1.0;
          for _ in 0..len {
            result = (&result * &result + 1.0).tanh();
          }
          result.backward().unwrap();
          black_box(x.grad())
        });
      },
    );
  }
  group.finish();
}

fn scalar_diamond_fan_out(c: &mut Criterion) {
  let mut group = c.benchmark_group("scalar/diamond_fan_out");

  // one leaf feeding `width` branches that are summed back together
  for width in [10, 100, 1000] {
    group.throughput(Throughput::Elements(width as u64));
    group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
      b.iter(|| {
        let x = Scalar::new(black_box(0.3));
        let mut total = Scalar::new(0.0);
        for i in 0..width {
          total = total + (&x * i as f64).sigmoid();
        }
        total.backward().unwrap();
        black_box(x.grad())
      });
    });
  }
  group.finish();
}

fn bench_topological_sort(c: &mut Criterion) {
  let mut group = c.benchmark_group("internal/topological_sort");

  for size in [100, 1000] {
    group.throughput(Throughput::Elements(size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      let x = Scalar::new(1.0);
      let mut y = x.clone();
      for _ in 0..size {
        y = &y + &x;
      }
      b.iter(|| black_box(topological_sort(&y).len()));
    });
  }
  group.finish();
}

// =============================================================================
// MATRIX BENCHMARKS
// =============================================================================

fn matrix_forward_chain(c: &mut Criterion) {
  let mut group = c.benchmark_group("matrix/forward_chain");

  for size in [4, 16, 64] {
    group.throughput(Throughput::Elements((size * size) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      let w = DMatrix::from_fn(size, size, |i, j| ((i + j) as f64 * 0.1).sin() / size as f64);
      b.iter(|| {
        let w = Tensor::new(black_box(w.clone()));
        let mut h = Tensor::new(DMatrix::from_element(1, size, 1.0));
        for _ in 0..10 {
          h = h.matmul(&w).tanh();
        }
        black_box(h.data().sum())
      });
    });
  }
  group.finish();
}

fn matrix_backward(c: &mut Criterion) {
  let mut group = c.benchmark_group("matrix/backward");

  for size in [4, 16, 64] {
    group.throughput(Throughput::Elements((size * size) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      let w = DMatrix::from_fn(size, size, |i, j| ((i + j) as f64 * 0.1).sin() / size as f64);
      b.iter(|| {
        let w = Tensor::new(black_box(w.clone()));
        let mut h = Tensor::new(DMatrix::from_element(1, size, 1.0));
        for _ in 0..10 {
          h = h.matmul(&w).tanh();
        }
        let loss = h.sum();
        loss.backward().unwrap();
        black_box(w.grad())
      });
    });
  }
  group.finish();
}

fn matrix_matmul(c: &mut Criterion) {
  let mut group = c.benchmark_group("matrix/matmul");

  for size in [8, 32, 128] {
    group.throughput(Throughput::Elements((size * size * size) as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
      let a = DMatrix::from_element(size, size, 0.5);
      b.iter(|| {
        let a = Tensor::new(black_box(a.clone()));
        let c = a.matmul(&a).sum();
        c.backward().unwrap();
        black_box(a.grad())
      });
    });
  }
  group.finish();
}

fn compare_scalar_vs_1x1_matrix(c: &mut Criterion) {
  let mut group = c.benchmark_group("comparison/scalar_vs_1x1");

  group.bench_function("scalar", |b| {
    b.iter(|| {
      let x = Scalar::new(black_box(0.5));
      let y = (&x * &x + 1.0).log().exp();
      y.backward().unwrap();
      black_box(x.grad())
    });
  });

  group.bench_function("matrix_1x1", |b| {
    b.iter(|| {
      let x = Tensor::new(black_box(DMatrix::from_element(1, 1, 0.5)));
      let y = (&x * &x + 1.0).log().exp();
      y.backward().unwrap();
      black_box(x.grad())
    });
  });

  group.finish();
}

criterion_group!(
  name = benches;
  config = Criterion::default().measurement_time(Duration::from_secs(10));
  targets =
    // Scalar benchmarks
    scalar_forward_chain,
    scalar_forward_chain_no_grad,
    scalar_backward_chain,
    scalar_diamond_fan_out,
    // Matrix benchmarks
    matrix_forward_chain,
    matrix_backward,
    matrix_matmul,
    // Comparison benchmarks
    compare_scalar_vs_1x1_matrix,
    // Internal benchmarks
    bench_topological_sort,
);

criterion_main!(benches);
