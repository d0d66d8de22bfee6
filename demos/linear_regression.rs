use std::fs::File;
use std::io::{BufWriter, Write};

use log::info;

use minigrad::Scalar;

fn linear_regression() {
  let x1_data = [1.0, 2.0, 3.0, 4.0, 5.0];
  let x2_data = [2.0, 1.0, 0.0, -1.0, 2.0];
  let mut y_data = Vec::with_capacity(x1_data.len());
  // y = 5.4*x1 - 2.3*x2 - 1.4 for each sample
  for i in 0..x1_data.len() {
    let y = 5.4 * x1_data[i] - 2.3 * x2_data[i] - 1.4;
    y_data.push(y);
  }

  let learning_rate = 0.02;
  let epochs = 10000;

  let file = File::create("training_loss.csv").unwrap();
  let mut buf = BufWriter::new(file);
  writeln!(buf, "epoch,loss").unwrap();

  let mut w1 = 0.0;
  let mut w2 = 0.0;
  let mut b = 0.0;

  for epoch in 0..epochs {
    // fresh leaves every step, the previous graph is dropped with them
    let w1_var = Scalar::new(w1);
    let w2_var = Scalar::new(w2);
    let b_var = Scalar::new(b);

    let n = x1_data.len() as f64;
    let mut mse = Scalar::new(0.0);
    for i in 0..x1_data.len() {
      // y_pred = w1*x1 + w2*x2 + b
      let y_pred = &w1_var * x1_data[i] + &w2_var * x2_data[i] + &b_var;
      let err = y_pred - y_data[i];
      mse = mse + &err * &err;
    }
    mse = mse / n;

    mse.backward().unwrap();
    w1 -= learning_rate * w1_var.grad().unwrap_or(0.0);
    w2 -= learning_rate * w2_var.grad().unwrap_or(0.0);
    b -= learning_rate * b_var.grad().unwrap_or(0.0);

    if epoch % 1000 == 0 {
      info!(
        "epoch {} | MSE = {:.4} | w1 = {:.4} | w2 = {:.4} | b = {:.4}",
        epoch,
        mse.data(),
        w1,
        w2,
        b
      );
    }
    let _ = writeln!(buf, "{},{}", epoch, mse.data());
  }
  println!("trained parameters:");
  println!("w1 = {w1:.4}");
  println!("w2 = {w2:.4}");
  println!("b  = {b:.4}");

  buf.flush().unwrap();
}

fn main() {
  env_logger::init();
  linear_regression();
}
