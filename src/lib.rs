//!
//! # minigrad
//!
//! ## Core API
//!
//! A small reverse-mode automatic differentiation engine. Every arithmetic
//! operation on a [`Var`] records a node in a computation graph; calling
//! `backward` on the final value walks that graph in reverse and deposits
//! `d(output)/d(leaf)` on every leaf that contributed.
//!
//! ```
//! use minigrad::Scalar;
//!
//! let x = Scalar::new(3.0);
//! let y = &x * &x + 2.0;
//! y.backward().unwrap();
//! assert_eq!(x.grad(), Some(6.0));
//! ```
//!
//! New operations are unit structs implementing [`Function`], recorded with
//! [`apply`]. Values are generic over the payload; `f64` ([`Scalar`]) and
//! `nalgebra::DMatrix<f64>` (`Tensor`, behind the `matrix` feature) are
//! provided.
//!

mod core;
pub mod error;
pub mod ops;

#[cfg(feature = "scalar")]
pub mod scalar;

#[cfg(feature = "matrix")]
pub mod matrix;

pub use crate::core::{
  apply, backpropagate, is_grad_enabled, no_grad, topological_sort, Context, Function, History,
  LocalGrads, NodeId, Operand, Var,
};
pub use crate::error::{GraphError, Result};

#[cfg(feature = "scalar")]
pub use crate::scalar::Scalar;

#[cfg(feature = "matrix")]
pub use crate::matrix::Tensor;
