use minigrad::Scalar;

fn main() {
  env_logger::init();

  // Every operation on a leaf records a node in the graph
  let x = Scalar::new(1.0);
  let y = &x * &x;
  // Walk the graph backwards, leaving dy/dx on x
  y.backward().unwrap();
  println!("Value: {}, dy/dx: {}", y.data(), x.grad().unwrap_or(0.0));
}
