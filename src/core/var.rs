use std::cell::RefCell;
use std::fmt;
use std::ops::AddAssign;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::core::autodiff;
use crate::core::context::Context;
use crate::core::function::Function;
use crate::error::{GraphError, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a node, assigned from a creation counter; two nodes
/// carrying identical data never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
  #[inline(always)]
  fn next() -> Self {
    Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
  }

  #[inline(always)]
  pub fn get(&self) -> u64 {
    self.0
  }
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "%{}", self.0)
  }
}

/// The edge recorded on an interior node: which operation produced it, the
/// context that operation filled in, and the parents in operand order.
pub struct History<T: 'static> {
  function: &'static dyn Function<T>,
  ctx: Context<T>,
  inputs: SmallVec<[Var<T>; 2]>,
}

impl<T: 'static> History<T> {
  pub(crate) fn new(
    function: &'static dyn Function<T>,
    ctx: Context<T>,
    inputs: SmallVec<[Var<T>; 2]>,
  ) -> Self {
    Self {
      function,
      ctx,
      inputs,
    }
  }

  #[inline]
  pub fn function(&self) -> &'static dyn Function<T> {
    self.function
  }

  #[inline]
  pub fn ctx(&self) -> &Context<T> {
    &self.ctx
  }

  #[inline]
  pub fn inputs(&self) -> &[Var<T>] {
    &self.inputs
  }
}

impl<T: 'static> fmt::Debug for History<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("History")
      .field("function", &self.function.name())
      .field(
        "inputs",
        &self.inputs.iter().map(Var::id).collect::<SmallVec<[_; 2]>>(),
      )
      .finish()
  }
}

struct Node<T: 'static> {
  id: NodeId,
  data: T,
  grad: RefCell<Option<T>>,
  /// `None` marks a leaf
  history: Option<History<T>>,
}

impl<T: 'static> Drop for Node<T> {
  /// Tear the graph down with a worklist; the default drop recurses once per
  /// ancestor and overflows the stack on long chains
  fn drop(&mut self) {
    let Some(history) = self.history.as_mut() else {
      return;
    };
    let mut stack: Vec<Var<T>> = history.inputs.drain(..).collect();
    while let Some(var) = stack.pop() {
      // only the last handle to a node owns its parents
      if let Ok(mut node) = Rc::try_unwrap(var.0) {
        if let Some(history) = node.history.as_mut() {
          stack.extend(history.inputs.drain(..));
        }
      }
    }
  }
}

/// A value participating in the computation graph.
///
/// Cloning a `Var` clones the handle, not the node: parents are shared by every
/// child that consumed them and live as long as the longest-lived of those.
pub struct Var<T: 'static>(Rc<Node<T>>);

impl<T: 'static> Var<T> {
  /// Create a leaf holding `data`
  pub fn new(data: T) -> Self {
    Self::from_parts(data, None)
  }

  pub(crate) fn from_parts(data: T, history: Option<History<T>>) -> Self {
    Var(Rc::new(Node {
      id: NodeId::next(),
      data,
      grad: RefCell::new(None),
      history,
    }))
  }

  #[inline(always)]
  pub fn id(&self) -> NodeId {
    self.0.id
  }

  #[inline(always)]
  pub fn data(&self) -> &T {
    &self.0.data
  }

  #[inline]
  pub fn history(&self) -> Option<&History<T>> {
    self.0.history.as_ref()
  }

  /// Parents in operand order, empty for a leaf
  #[inline]
  pub fn parents(&self) -> &[Var<T>] {
    match &self.0.history {
      Some(history) => history.inputs(),
      None => &[],
    }
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.0.history.is_none()
  }

  /// The gradient persisted on this node, `None` standing in for zero
  pub fn grad(&self) -> Option<T>
  where
    T: Clone,
  {
    self.0.grad.borrow().clone()
  }

  /// Forget any gradient accumulated by earlier backward passes
  pub fn zero_grad(&self) {
    *self.0.grad.borrow_mut() = None;
  }

  /// Add `d` into the gradient of a leaf
  pub fn accumulate_grad(&self, d: T) -> Result<()>
  where
    T: AddAssign,
  {
    if !self.is_leaf() {
      return Err(GraphError::NotALeaf { id: self.id() });
    }
    let mut grad = self.0.grad.borrow_mut();
    match grad.as_mut() {
      Some(g) => *g += d,
      None => *grad = Some(d),
    }
    Ok(())
  }

  /// Push `upstream` through the operation that produced this node, pairing
  /// every parent with its local gradient in operand order
  pub fn chain_rule(&self, upstream: &T) -> Result<SmallVec<[(Var<T>, T); 2]>> {
    let history = self
      .history()
      .ok_or(GraphError::MissingHistory { id: self.id() })?;
    let grads = history.function.backward(&history.ctx, upstream)?;
    if grads.len() != history.inputs.len() {
      return Err(GraphError::ArityMismatch {
        function: history.function.name(),
        expected: history.inputs.len(),
        actual: grads.len(),
      });
    }
    Ok(history.inputs.iter().cloned().zip(grads).collect())
  }

  /// Seed this node with `seed` and backpropagate to every leaf that
  /// contributed to it
  pub fn backward_with(&self, seed: T) -> Result<()>
  where
    T: Clone + AddAssign,
  {
    *self.0.grad.borrow_mut() = Some(seed.clone());
    autodiff::backpropagate(self, seed)
  }
}

impl<T: 'static> Clone for Var<T> {
  fn clone(&self) -> Self {
    Var(Rc::clone(&self.0))
  }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Var<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Var")
      .field("id", &self.0.id)
      .field("data", &self.0.data)
      .field("grad", &self.0.grad.borrow())
      .field("leaf", &self.is_leaf())
      .finish()
  }
}
