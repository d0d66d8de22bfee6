//!
//! Operation markers shared by every payload.
//!
//! Each marker is a stateless unit struct; the payload modules implement
//! [`Function`](crate::Function) for them (`f64` in `scalar`, `DMatrix<f64>` in
//! `matrix`). Only a few are primitive: subtraction, negation and division are
//! built from these by the arithmetic surface.
//!

/// `a + b`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOp;

/// `a * b`, elementwise for matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulOp;

/// `a ^ b`, elementwise for matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowOp;

/// Natural logarithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpOp;

/// `1 / (1 + e^-a)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigmoidOp;

/// `max(a, 0)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReluOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TanhOp;

/// Matrix product, matrices only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatMulOp;

/// Sum of all entries into a 1x1 matrix, matrices only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumOp;

/// Numerically stable logistic function, shared by both payloads
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
  if x >= 0.0 {
    1.0 / (1.0 + (-x).exp())
  } else {
    let e = x.exp();
    e / (1.0 + e)
  }
}
