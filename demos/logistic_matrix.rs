use log::info;
use nalgebra::{dmatrix, DMatrix};

use minigrad::{no_grad, Tensor};

/// Mean binary cross-entropy of `sigmoid(x w + b)` against `y`
fn loss(x: &DMatrix<f64>, y: &DMatrix<f64>, w: &Tensor, b: &Tensor) -> Tensor {
  let n = x.nrows() as f64;
  let logits = Tensor::new(x.clone()).matmul(w) + b;
  let p = logits.sigmoid();
  let y = Tensor::new(y.clone());
  let ce = &y * p.log() + (1.0 - &y) * (1.0 - &p).log();
  -ce.sum() / n
}

fn main() {
  env_logger::init();

  // two features, label is 1 when their sum is positive
  let x = dmatrix![
     1.0,  2.0;
     0.5, -0.2;
    -1.0, -0.5;
    -2.0,  1.0;
     2.0, -1.5;
    -0.3, -0.9
  ];
  let y = dmatrix![1.0; 1.0; 0.0; 0.0; 1.0; 0.0];

  let learning_rate = 0.5;
  let mut w = DMatrix::zeros(2, 1);
  // bias broadcast over the batch
  let mut b = DMatrix::zeros(x.nrows(), 1);

  for epoch in 0..500 {
    let w_var = Tensor::new(w.clone());
    let b_var = Tensor::new(b.clone());
    let batch_loss = loss(&x, &y, &w_var, &b_var);
    batch_loss.backward().unwrap();

    w -= w_var.grad().unwrap() * learning_rate;
    // keep the bias a single shared value
    let db = b_var.grad().unwrap().sum();
    b.add_scalar_mut(-learning_rate * db);

    if epoch % 50 == 0 {
      info!("epoch {} | loss = {:.4}", epoch, batch_loss.data()[(0, 0)]);
    }
  }

  let final_loss = no_grad(|| loss(&x, &y, &Tensor::new(w.clone()), &Tensor::new(b.clone())));
  println!("w = {}", w.transpose());
  println!("b = {:.4}", b[(0, 0)]);
  println!("loss = {:.4}", final_loss.data()[(0, 0)]);
}
