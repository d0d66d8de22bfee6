//!
//! Structural errors raised while walking a recorded graph.
//!
//! Numeric trouble (log of a negative number, overflow in exp) is not an error
//! here: kernels follow IEEE-754 and hand back `NaN`/`inf` untouched.
//!

use thiserror::Error;

use crate::core::NodeId;

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// Gradients only persist on leaves
  #[error("node {id} is not a leaf, only leaves can accumulate a gradient")]
  NotALeaf { id: NodeId },

  #[error("node {id} is a leaf, there is no history to apply the chain rule through")]
  MissingHistory { id: NodeId },

  /// A node was visited before any path from the root reached it
  #[error("no pending derivative was recorded for node {id}")]
  MissingDerivative { id: NodeId },

  #[error("`{function}` produced {actual} local gradients for {expected} inputs")]
  ArityMismatch {
    function: &'static str,
    expected: usize,
    actual: usize,
  },

  /// Usually means the forward pass ran with gradient recording disabled
  #[error("`{function}` needs {expected} saved values, found {actual}")]
  MissingSavedValues {
    function: &'static str,
    expected: usize,
    actual: usize,
  },
}
