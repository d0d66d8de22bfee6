//!
//! # scalar
//!
//! `f64` kernels for the operation catalog, and the arithmetic surface that
//! makes `Scalar` read like a plain number.
//!
//! Only addition, multiplication and power are recorded as operations;
//! negation, subtraction and division are spelled in terms of them, so the
//! graph holds every intermediate step:
//!
//! - `-x` is `x * -1`
//! - `a - b` is `a + (-b)`
//! - `a / b` is `a * b^-1`
//!
//! Negating or inverting a raw `f64` operand happens on the number itself,
//! nothing is recorded for it.
//!
//! `^` is power. Mind the precedence: it binds looser than `+` and `*`, so
//! write `(&x ^ 2.0) + 1.0`.
//!

use std::ops::{Add, BitXor, Div, Mul, Neg, Sub};

use crate::core::{apply, Context, Function, LocalGrads, Operand, Var};
use crate::error::Result;
use crate::ops::{self, AddOp, ExpOp, LogOp, MulOp, PowOp, ReluOp, SigmoidOp, TanhOp};

pub type Scalar = Var<f64>;

impl From<f64> for Operand<f64> {
  fn from(data: f64) -> Self {
    Operand::Raw(data)
  }
}

impl Function<f64> for AddOp {
  fn name(&self) -> &'static str {
    "add"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, _ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    inputs[0] + inputs[1]
  }

  fn backward(&self, _ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    Ok((*upstream, *upstream).into())
  }
}

impl Function<f64> for MulOp {
  fn name(&self) -> &'static str {
    "mul"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    ctx.save_for_backward([inputs[0], inputs[1]]);
    inputs[0] * inputs[1]
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [a, b] = ctx.saved::<2>(Function::<f64>::name(self))?;
    Ok((b * upstream, a * upstream).into())
  }
}

impl Function<f64> for PowOp {
  fn name(&self) -> &'static str {
    "pow"
  }

  fn arity(&self) -> usize {
    2
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    ctx.save_for_backward([inputs[0], inputs[1]]);
    inputs[0].powf(inputs[1])
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [a, b] = ctx.saved::<2>(Function::<f64>::name(self))?;
    // d/da = b a^(b-1), d/db = a^b ln(a); the latter is NaN for a < 0
    let da = b * a.powf(b - 1.0) * upstream;
    let db = a.powf(*b) * a.ln() * upstream;
    Ok((da, db).into())
  }
}

impl Function<f64> for LogOp {
  fn name(&self) -> &'static str {
    "log"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    ctx.save_for_backward([inputs[0]]);
    inputs[0].ln()
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [a] = ctx.saved::<1>(Function::<f64>::name(self))?;
    Ok((upstream / a).into())
  }
}

impl Function<f64> for ExpOp {
  fn name(&self) -> &'static str {
    "exp"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    let out = inputs[0].exp();
    ctx.save_for_backward([out]);
    out
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [out] = ctx.saved::<1>(Function::<f64>::name(self))?;
    Ok((out * upstream).into())
  }
}

impl Function<f64> for SigmoidOp {
  fn name(&self) -> &'static str {
    "sigmoid"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    let out = ops::sigmoid(inputs[0]);
    ctx.save_for_backward([out]);
    out
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [s] = ctx.saved::<1>(Function::<f64>::name(self))?;
    Ok((s * (1.0 - s) * upstream).into())
  }
}

impl Function<f64> for ReluOp {
  fn name(&self) -> &'static str {
    "relu"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    ctx.save_for_backward([inputs[0]]);
    inputs[0].max(0.0)
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [a] = ctx.saved::<1>(Function::<f64>::name(self))?;
    // subgradient 0 at the kink
    let grad = if *a > 0.0 { *upstream } else { 0.0 };
    Ok(grad.into())
  }
}

impl Function<f64> for TanhOp {
  fn name(&self) -> &'static str {
    "tanh"
  }

  fn arity(&self) -> usize {
    1
  }

  fn forward(&self, ctx: &mut Context<f64>, inputs: &[f64]) -> f64 {
    let out = inputs[0].tanh();
    ctx.save_for_backward([out]);
    out
  }

  fn backward(&self, ctx: &Context<f64>, upstream: &f64) -> Result<LocalGrads<f64>> {
    let [t] = ctx.saved::<1>(Function::<f64>::name(self))?;
    Ok(((1.0 - t * t) * upstream).into())
  }
}

#[inline]
fn plus(lhs: Operand<f64>, rhs: Operand<f64>) -> Scalar {
  apply(&AddOp, [lhs, rhs])
}

#[inline]
fn times(lhs: Operand<f64>, rhs: Operand<f64>) -> Scalar {
  apply(&MulOp, [lhs, rhs])
}

#[inline]
fn power(base: Operand<f64>, exponent: Operand<f64>) -> Scalar {
  apply(&PowOp, [base, exponent])
}

#[inline]
fn negated(x: Operand<f64>) -> Operand<f64> {
  match x {
    Operand::Raw(v) => Operand::Raw(-v),
    node => Operand::Node(times(node, Operand::Raw(-1.0))),
  }
}

#[inline]
fn inverted(x: Operand<f64>) -> Operand<f64> {
  match x {
    Operand::Raw(v) => Operand::Raw(v.powf(-1.0)),
    node => Operand::Node(power(node, Operand::Raw(-1.0))),
  }
}

#[inline]
fn minus(lhs: Operand<f64>, rhs: Operand<f64>) -> Scalar {
  plus(lhs, negated(rhs))
}

#[inline]
fn over(lhs: Operand<f64>, rhs: Operand<f64>) -> Scalar {
  times(lhs, inverted(rhs))
}

impl Var<f64> {
  /// `self ^ exponent`, the exponent being a raw number or another node
  #[inline]
  pub fn pow<E>(&self, exponent: E) -> Scalar
  where
    E: Into<Operand<f64>>,
  {
    power(self.into(), exponent.into())
  }

  /// Natural logarithm; `NaN` for negative values, `-inf` at zero
  #[inline]
  pub fn log(&self) -> Scalar {
    apply(&LogOp, [Operand::from(self)])
  }

  #[inline]
  pub fn exp(&self) -> Scalar {
    apply(&ExpOp, [Operand::from(self)])
  }

  #[inline]
  pub fn sigmoid(&self) -> Scalar {
    apply(&SigmoidOp, [Operand::from(self)])
  }

  #[inline]
  pub fn relu(&self) -> Scalar {
    apply(&ReluOp, [Operand::from(self)])
  }

  #[inline]
  pub fn tanh(&self) -> Scalar {
    apply(&TanhOp, [Operand::from(self)])
  }

  /// Differentiate this value with respect to every leaf it depends on,
  /// seeding with `1.0`
  #[inline]
  pub fn backward(&self) -> Result<()> {
    self.backward_with(1.0)
  }
}

// every owned/borrowed pairing of two scalars, plus raw f64 on either side
macro_rules! scalar_binary_op {
  ($trait:ident, $method:ident, $kernel:ident) => {
    impl $trait<&Scalar> for &Scalar {
      type Output = Scalar;

      #[inline]
      fn $method(self, rhs: &Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<Scalar> for &Scalar {
      type Output = Scalar;

      #[inline(always)]
      fn $method(self, rhs: Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<&Scalar> for Scalar {
      type Output = Scalar;

      #[inline(always)]
      fn $method(self, rhs: &Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<Scalar> for Scalar {
      type Output = Scalar;

      #[inline(always)]
      fn $method(self, rhs: Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<f64> for &Scalar {
      type Output = Scalar;

      #[inline]
      fn $method(self, rhs: f64) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<f64> for Scalar {
      type Output = Scalar;

      #[inline(always)]
      fn $method(self, rhs: f64) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<&Scalar> for f64 {
      type Output = Scalar;

      #[inline]
      fn $method(self, rhs: &Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }

    impl $trait<Scalar> for f64 {
      type Output = Scalar;

      #[inline(always)]
      fn $method(self, rhs: Scalar) -> Scalar {
        $kernel(self.into(), rhs.into())
      }
    }
  };
}

scalar_binary_op!(Add, add, plus);
scalar_binary_op!(Sub, sub, minus);
scalar_binary_op!(Mul, mul, times);
scalar_binary_op!(Div, div, over);
scalar_binary_op!(BitXor, bitxor, power);

impl Neg for &Scalar {
  type Output = Scalar;

  #[inline]
  fn neg(self) -> Scalar {
    times(self.into(), Operand::Raw(-1.0))
  }
}

impl Neg for Scalar {
  type Output = Scalar;

  #[inline(always)]
  fn neg(self) -> Scalar {
    -&self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  fn grad(x: &Scalar) -> f64 {
    x.grad().unwrap_or(0.0)
  }

  mod var {
    use super::*;

    #[test]
    fn leaf() {
      let a = Scalar::new(1.3);
      assert_eq!(*a.data(), 1.3);
      assert!(a.is_leaf());
      assert_eq!(a.grad(), None);
    }

    #[test]
    fn add() {
      let a = Scalar::new(3.0);
      let b = Scalar::new(4.0);
      let c = &a + &b;
      assert_eq!(*c.data(), 7.0);
      c.backward().unwrap();
      // df/da = 1, df/db = 1
      assert_eq!(grad(&a), 1.0);
      assert_eq!(grad(&b), 1.0);
    }

    #[test]
    fn add_f64() {
      let a = Scalar::new(3.0);
      let c = &a + 5.0;
      assert_eq!(*c.data(), 8.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 1.0);
    }

    #[test]
    fn radd_f64() {
      let a = Scalar::new(3.0);
      let c = 5.0 + &a;
      assert_eq!(*c.data(), 8.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 1.0);
    }

    #[test]
    fn sub() {
      let a = Scalar::new(7.0);
      let b = Scalar::new(4.0);
      let c = &a - &b;
      assert_eq!(*c.data(), 3.0);
      c.backward().unwrap();
      // df/da = 1, df/db = -1
      assert_eq!(grad(&a), 1.0);
      assert_eq!(grad(&b), -1.0);
    }

    #[test]
    fn sub_f64() {
      let a = Scalar::new(7.0);
      let c = &a - 3.0;
      assert_eq!(*c.data(), 4.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 1.0);
    }

    #[test]
    fn rsub_f64() {
      let a = Scalar::new(7.0);
      let c = 3.0 - &a;
      assert_eq!(*c.data(), -4.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), -1.0);
    }

    #[test]
    fn mul() {
      let a = Scalar::new(3.0);
      let b = Scalar::new(4.0);
      let c = &a * &b;
      assert_eq!(*c.data(), 12.0);
      c.backward().unwrap();
      // df/da = b, df/db = a
      assert_eq!(grad(&a), 4.0);
      assert_eq!(grad(&b), 3.0);
    }

    #[test]
    fn mul_f64() {
      let a = Scalar::new(3.0);
      let c = &a * 5.0;
      assert_eq!(*c.data(), 15.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 5.0);
    }

    #[test]
    fn div() {
      let a = Scalar::new(6.0);
      let b = Scalar::new(3.0);
      let c = &a / &b;
      assert_relative_eq!(*c.data(), 2.0);
      c.backward().unwrap();
      // df/da = 1/b, df/db = -a/b^2
      assert_relative_eq!(grad(&a), 1.0 / 3.0);
      assert_relative_eq!(grad(&b), -6.0 / 9.0);
    }

    #[test]
    fn div_f64() {
      let a = Scalar::new(6.0);
      let c = &a / 2.0;
      assert_eq!(*c.data(), 3.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 0.5);
    }

    #[test]
    fn rdiv_f64() {
      let a = Scalar::new(2.0);
      let c = 6.0 / &a;
      assert_relative_eq!(*c.data(), 3.0);
      c.backward().unwrap();
      // df/da = -6/a^2
      assert_relative_eq!(grad(&a), -1.5);
    }

    #[test]
    fn neg() {
      let a = Scalar::new(2.0);
      let b = -&a;
      assert_eq!(*b.data(), -2.0);
      b.backward().unwrap();
      assert_eq!(grad(&a), -1.0);
    }

    #[test]
    fn pow() {
      let a = Scalar::new(2.0);
      let b = Scalar::new(3.0);
      let c = a.pow(&b);
      assert_eq!(*c.data(), 8.0);
      c.backward().unwrap();
      // df/da = b a^(b-1), df/db = a^b ln(a)
      assert_eq!(grad(&a), 3.0 * 4.0);
      assert_eq!(grad(&b), 8.0 * 2.0f64.ln());
    }

    #[test]
    fn pow_f64() {
      let a = Scalar::new(2.0);
      let c = &a ^ 3.0;
      assert_eq!(*c.data(), 8.0);
      c.backward().unwrap();
      assert_eq!(grad(&a), 12.0);
    }

    #[test]
    fn log() {
      let a = Scalar::new(5.6);
      let b = a.log();
      assert_eq!(*b.data(), 5.6f64.ln());
      b.backward().unwrap();
      // df/da = 1/a
      assert_eq!(grad(&a), 1.0 / 5.6);
    }

    #[test]
    fn log_negative_is_nan() {
      let a = Scalar::new(-1.0);
      assert!(a.log().data().is_nan());
    }

    #[test]
    fn exp() {
      let a = Scalar::new(1.3);
      let b = a.exp();
      assert_eq!(*b.data(), 1.3f64.exp());
      b.backward().unwrap();
      assert_eq!(grad(&a), 1.3f64.exp());
    }

    #[test]
    fn sigmoid() {
      let a = Scalar::new(0.0);
      let b = a.sigmoid();
      assert_eq!(*b.data(), 0.5);
      b.backward().unwrap();
      // s (1 - s)
      assert_eq!(grad(&a), 0.25);
    }

    #[test]
    fn relu() {
      let a = Scalar::new(2.5);
      let b = Scalar::new(-2.5);
      let c = a.relu();
      let d = b.relu();
      assert_eq!(*c.data(), 2.5);
      assert_eq!(*d.data(), 0.0);
      c.backward().unwrap();
      d.backward().unwrap();
      assert_eq!(grad(&a), 1.0);
      assert_eq!(grad(&b), 0.0);
    }

    #[test]
    fn tanh() {
      let a = Scalar::new(0.8);
      let b = a.tanh();
      assert_eq!(*b.data(), 0.8f64.tanh());
      b.backward().unwrap();
      // 1 - tanh^2
      assert_relative_eq!(grad(&a), 1.0 / (0.8f64.cosh() * 0.8f64.cosh()));
    }
  }

  mod graph {
    use super::*;

    #[test]
    fn sub_records_negation() {
      let a = Scalar::new(7.0);
      let b = Scalar::new(4.0);
      let c = &a - &b;
      // c = add(a, mul(b, -1))
      assert_eq!(c.history().unwrap().function().name(), "add");
      let negation = &c.parents()[1];
      assert_eq!(negation.history().unwrap().function().name(), "mul");
      assert_eq!(negation.parents()[0].id(), b.id());
    }

    #[test]
    fn raw_negation_not_recorded() {
      let a = Scalar::new(7.0);
      let c = &a - 3.0;
      assert_eq!(c.history().unwrap().function().name(), "add");
      let rhs = &c.parents()[1];
      assert!(rhs.is_leaf());
      assert_eq!(*rhs.data(), -3.0);
    }

    #[test]
    fn div_records_power() {
      let a = Scalar::new(6.0);
      let b = Scalar::new(3.0);
      let c = &a / &b;
      assert_eq!(c.history().unwrap().function().name(), "mul");
      let inverse = &c.parents()[1];
      assert_eq!(inverse.history().unwrap().function().name(), "pow");
      assert_eq!(*inverse.parents()[1].data(), -1.0);
    }

    #[test]
    fn reflected_keeps_operand_order() {
      let a = Scalar::new(2.0);
      let c = 5.0 * &a;
      assert_eq!(*c.parents()[0].data(), 5.0);
      assert_eq!(c.parents()[1].id(), a.id());
    }
  }

  mod gradients {
    use super::*;

    #[test]
    fn composite() {
      let a = Scalar::new(5.0);
      let b = Scalar::new(2.0);
      let c = Scalar::new(1.0);
      // a^b - exp(c) / 2 + sigmoid(0)
      let res = a.pow(&b) - c.exp() / 2.0 + Scalar::new(0.0).sigmoid();
      assert_relative_eq!(*res.data(), 25.0 - 1.0f64.exp() / 2.0 + 0.5);
      res.backward().unwrap();
      assert_relative_eq!(grad(&a), 2.0 * 5.0);
      assert_relative_eq!(grad(&b), 25.0 * 5.0f64.ln());
      assert_relative_eq!(grad(&c), -1.0f64.exp() / 2.0);
    }

    #[test]
    fn reused_through_functions() {
      // y = x * exp(x), dy/dx = exp(x) (1 + x)
      let x = Scalar::new(0.7);
      let y = &x * x.exp();
      y.backward().unwrap();
      assert_relative_eq!(grad(&x), 0.7f64.exp() * 1.7);
    }

    #[test]
    fn neuron() {
      // tanh(w * x + b)
      let w = Scalar::new(-0.5);
      let x = Scalar::new(2.0);
      let b = Scalar::new(0.25);
      let out = (&w * &x + &b).tanh();
      out.backward().unwrap();
      let t = (-0.75f64).tanh();
      assert_relative_eq!(grad(&w), (1.0 - t * t) * 2.0);
      assert_relative_eq!(grad(&x), (1.0 - t * t) * -0.5);
      assert_relative_eq!(grad(&b), 1.0 - t * t);
    }
  }
}
