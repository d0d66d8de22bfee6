//!
//! # matrix
//!
//! `DMatrix<f64>` kernels for the operation catalog, using nalgebra for the
//! actual linear algebra.
//!
//! Arithmetic operators are elementwise; use [`Var::matmul`] for the matrix
//! product. A raw `f64` mixed into an expression is broadcast to a matrix of
//! the node's shape. Shape mismatches panic, as nalgebra does.
//!

use std::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::DMatrix;

use crate::core::{apply, Context, Function, LocalGrads, Operand, Var};
use crate::error::Result;
use crate::ops::{
  self, AddOp, ExpOp, LogOp, MatMulOp, MulOp, PowOp, ReluOp, SigmoidOp, SumOp, TanhOp,
};

pub type Tensor = Var<DMatrix<f64>>;

impl From<DMatrix<f64>> for Operand<DMatrix<f64>> {
  fn from(data: DMatrix<f64>) -> Self {
    Operand::Raw(data)
  }
}

impl Function<DMatrix<f64>> for AddOp {
  fn name(&self) -> &'static str {
    "add"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, _ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    &inputs[0] + &inputs[1]
  }

  fn backward(
    &self,
    _ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    Ok((upstream.clone(), upstream.clone()).into())
  }
}

impl Function<DMatrix<f64>> for MulOp {
  fn name(&self) -> &'static str {
    "mul"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = inputs[0].component_mul(&inputs[1]);
    ctx.save_for_backward(inputs.iter().cloned());
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [a, b] = ctx.saved::<2>(Function::<DMatrix<f64>>::name(self))?;
    Ok((upstream.component_mul(b), upstream.component_mul(a)).into())
  }
}

impl Function<DMatrix<f64>> for PowOp {
  fn name(&self) -> &'static str {
    "pow"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = inputs[0].zip_map(&inputs[1], f64::powf);
    ctx.save_for_backward(inputs.iter().cloned());
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [a, b] = ctx.saved::<2>(Function::<DMatrix<f64>>::name(self))?;
    let da = a.zip_map(b, |x, y| y * x.powf(y - 1.0));
    let db = a.zip_map(b, |x, y| x.powf(y) * x.ln());
    Ok((da.component_mul(upstream), db.component_mul(upstream)).into())
  }
}

impl Function<DMatrix<f64>> for LogOp {
  fn name(&self) -> &'static str {
    "log"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    ctx.save_for_backward([inputs[0].clone()]);
    inputs[0].map(f64::ln)
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [a] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(upstream.component_div(a).into())
  }
}

impl Function<DMatrix<f64>> for ExpOp {
  fn name(&self) -> &'static str {
    "exp"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = inputs[0].map(f64::exp);
    ctx.save_for_backward([out.clone()]);
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [out] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(out.component_mul(upstream).into())
  }
}

impl Function<DMatrix<f64>> for SigmoidOp {
  fn name(&self) -> &'static str {
    "sigmoid"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = inputs[0].map(ops::sigmoid);
    ctx.save_for_backward([out.clone()]);
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [s] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(s.zip_map(upstream, |s, d| s * (1.0 - s) * d).into())
  }
}

impl Function<DMatrix<f64>> for ReluOp {
  fn name(&self) -> &'static str {
    "relu"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    ctx.save_for_backward([inputs[0].clone()]);
    inputs[0].map(|x| x.max(0.0))
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [a] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(a.zip_map(upstream, |x, d| if x > 0.0 { d } else { 0.0 }).into())
  }
}

impl Function<DMatrix<f64>> for TanhOp {
  fn name(&self) -> &'static str {
    "tanh"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = inputs[0].map(f64::tanh);
    ctx.save_for_backward([out.clone()]);
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [t] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(t.zip_map(upstream, |t, d| (1.0 - t * t) * d).into())
  }
}

impl Function<DMatrix<f64>> for MatMulOp {
  fn name(&self) -> &'static str {
    "matmul"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let out = &inputs[0] * &inputs[1];
    ctx.save_for_backward(inputs.iter().cloned());
    out
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [a, b] = ctx.saved::<2>(Function::<DMatrix<f64>>::name(self))?;
    // c = ab: dc/da = d b^T, dc/db = a^T d
    Ok((upstream * b.transpose(), a.transpose() * upstream).into())
  }
}

impl Function<DMatrix<f64>> for SumOp {
  fn name(&self) -> &'static str {
    "sum"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<DMatrix<f64>>, inputs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let total = inputs[0].sum();
    // only the shape is needed later
    ctx.save_for_backward([DMatrix::zeros(inputs[0].nrows(), inputs[0].ncols())]);
    DMatrix::from_element(1, 1, total)
  }

  fn backward(
    &self,
    ctx: &Context<DMatrix<f64>>,
    upstream: &DMatrix<f64>,
  ) -> Result<LocalGrads<DMatrix<f64>>> {
    let [shape] = ctx.saved::<1>(Function::<DMatrix<f64>>::name(self))?;
    Ok(DMatrix::from_element(shape.nrows(), shape.ncols(), upstream[(0, 0)]).into())
  }
}

/// `value` broadcast to the shape of `like`
#[inline]
fn filled(like: &Tensor, value: f64) -> Operand<DMatrix<f64>> {
  let data = like.data();
  Operand::Raw(DMatrix::from_element(data.nrows(), data.ncols(), value))
}

#[inline]
fn plus(lhs: Operand<DMatrix<f64>>, rhs: Operand<DMatrix<f64>>) -> Tensor {
  apply(&AddOp, [lhs, rhs])
}

#[inline]
fn times(lhs: Operand<DMatrix<f64>>, rhs: Operand<DMatrix<f64>>) -> Tensor {
  apply(&MulOp, [lhs, rhs])
}

#[inline]
fn power(base: Operand<DMatrix<f64>>, exponent: Operand<DMatrix<f64>>) -> Tensor {
  apply(&PowOp, [base, exponent])
}

#[inline]
fn negated(x: Operand<DMatrix<f64>>) -> Operand<DMatrix<f64>> {
  match x {
    Operand::Raw(m) => Operand::Raw(-m),
    Operand::Node(var) => {
      let minus_one = filled(&var, -1.0);
      Operand::Node(times(var.into(), minus_one))
    }
  }
}

#[inline]
fn inverted(x: Operand<DMatrix<f64>>) -> Operand<DMatrix<f64>> {
  match x {
    Operand::Raw(m) => Operand::Raw(m.map(|v| v.powf(-1.0))),
    Operand::Node(var) => {
      let minus_one = filled(&var, -1.0);
      Operand::Node(power(var.into(), minus_one))
    }
  }
}

#[inline]
fn minus(lhs: Operand<DMatrix<f64>>, rhs: Operand<DMatrix<f64>>) -> Tensor {
  plus(lhs, negated(rhs))
}

#[inline]
fn over(lhs: Operand<DMatrix<f64>>, rhs: Operand<DMatrix<f64>>) -> Tensor {
  times(lhs, inverted(rhs))
}

impl Var<DMatrix<f64>> {
  /// Elementwise power, the exponent being a matrix of the same shape or
  /// another node
  #[inline]
  pub fn pow<E>(&self, exponent: E) -> Tensor
  where
    E: Into<Operand<DMatrix<f64>>>,
  {
    power(self.into(), exponent.into())
  }

  /// Elementwise power by a single exponent
  #[inline]
  pub fn powf(&self, exponent: f64) -> Tensor {
    power(self.into(), filled(self, exponent))
  }

  #[inline]
  pub fn matmul(&self, rhs: &Tensor) -> Tensor {
    apply(&MatMulOp, [Operand::from(self), Operand::from(rhs)])
  }

  /// Sum of every entry, as a 1x1 matrix
  #[inline]
  pub fn sum(&self) -> Tensor {
    apply(&SumOp, [Operand::from(self)])
  }

  #[inline]
  pub fn log(&self) -> Tensor {
    apply(&LogOp, [Operand::from(self)])
  }

  #[inline]
  pub fn exp(&self) -> Tensor {
    apply(&ExpOp, [Operand::from(self)])
  }

  #[inline]
  pub fn sigmoid(&self) -> Tensor {
    apply(&SigmoidOp, [Operand::from(self)])
  }

  #[inline]
  pub fn relu(&self) -> Tensor {
    apply(&ReluOp, [Operand::from(self)])
  }

  #[inline]
  pub fn tanh(&self) -> Tensor {
    apply(&TanhOp, [Operand::from(self)])
  }

  #[inline]
  pub fn shape(&self) -> (usize, usize) {
    self.data().shape()
  }

  /// Backpropagate seeding with a matrix of ones shaped like this node
  #[inline]
  pub fn backward(&self) -> Result<()> {
    let (rows, cols) = self.shape();
    self.backward_with(DMatrix::from_element(rows, cols, 1.0))
  }
}

macro_rules! tensor_binary_op {
  ($trait:ident, $method:ident, $kernel:ident) => {
    impl $trait<&Tensor> for &Tensor {
      type Output = Tensor;

      #[inline]
      fn $method(self, rhs: &Tensor) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<Tensor> for &Tensor {
      type Output = Tensor;

      #[inline(always)]
      fn $method(self, rhs: Tensor) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<&Tensor> for Tensor {
      type Output = Tensor;

      #[inline(always)]
      fn $method(self, rhs: &Tensor) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<Tensor> for Tensor {
      type Output = Tensor;

      #[inline(always)]
      fn $method(self, rhs: Tensor) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<f64> for &Tensor {
      type Output = Tensor;

      #[inline]
      fn $method(self, rhs: f64) -> Tensor {
        $kernel(self.into(), filled(self, rhs))
      }
    }

    impl $trait<f64> for Tensor {
      type Output = Tensor;

      #[inline(always)]
      fn $method(self, rhs: f64) -> Tensor {
        $kernel((&self).into(), filled(&self, rhs))
      }
    }

    impl $trait<&Tensor> for f64 {
      type Output = Tensor;

      #[inline]
      fn $method(self, rhs: &Tensor) -> Tensor {
        $kernel(filled(rhs, self), rhs.into())
      }
    }

    impl $trait<Tensor> for f64 {
      type Output = Tensor;

      #[inline(always)]
      fn $method(self, rhs: Tensor) -> Tensor {
        $kernel(filled(&rhs, self), rhs.into())
      }
    }

    impl $trait<DMatrix<f64>> for &Tensor {
      type Output = Tensor;

      #[inline]
      fn $method(self, rhs: DMatrix<f64>) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<&Tensor> for DMatrix<f64> {
      type Output = Tensor;

      #[inline]
      fn $method(self, rhs: &Tensor) -> Tensor {
        $kernel(self.into(), rhs.into())
      }
    }
  };
}

tensor_binary_op!(Add, add, plus);
tensor_binary_op!(Sub, sub, minus);
tensor_binary_op!(Mul, mul, times);
tensor_binary_op!(Div, div, over);

impl Neg for &Tensor {
  type Output = Tensor;

  #[inline]
  fn neg(self) -> Tensor {
    times(self.into(), filled(self, -1.0))
  }
}

impl Neg for Tensor {
  type Output = Tensor;

  #[inline(always)]
  fn neg(self) -> Tensor {
    -&self
  }
}
