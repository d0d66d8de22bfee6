//!
//! # core
//!
//! The graph machinery, independent of what a value actually holds:
//!
//! - [`Context`] carries what a forward pass saved for its pullback
//! - [`Function`] is the forward/backward protocol and [`apply`] records one
//!   application of it as a new [`Var`]
//! - [`topological_sort`] and [`backpropagate`] run the reverse pass
//!

mod autodiff;
mod context;
mod function;
mod mode;
mod var;

pub use autodiff::{backpropagate, topological_sort};
pub use context::Context;
pub use function::{apply, Function, LocalGrads, Operand};
pub use mode::{is_grad_enabled, no_grad};
pub use var::{History, NodeId, Var};
