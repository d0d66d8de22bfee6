use std::fmt;

use log::trace;

use smallvec::SmallVec;

use crate::core::context::Context;
use crate::core::mode;
use crate::core::var::{History, Var};
use crate::error::Result;

/// A differentiable operation: a stateless forward/backward pair over raw
/// payloads of type `T`.
///
/// Operations are unit structs; the graph only ever holds a `&'static`
/// reference to one, so registering an operation is just implementing this
/// trait and passing `&MyOp` to [`apply`].
pub trait Function<T> {
  /// Name used in logs and errors
  fn name(&self) -> &'static str;

  /// Number of operands `forward` expects
  fn arity(&self) -> usize;

  /// Pure forward computation over raw operands; anything the pullback needs
  /// must be stored through `ctx.save_for_backward`
  fn forward(&self, ctx: &mut Context<T>, inputs: &[T]) -> T;

  /// Given the derivative of the final output w.r.t. this operation's output,
  /// produce the derivative w.r.t. each input, in input order
  fn backward(&self, ctx: &Context<T>, upstream: &T) -> Result<LocalGrads<T>>;
}

/// Local gradients returned by a pullback, one per forward input; a lone
/// gradient converts into a one-element sequence so unary operations can just
/// return `Ok(grad.into())`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalGrads<T>(SmallVec<[T; 2]>);

impl<T> LocalGrads<T> {
  #[inline]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[inline]
  pub fn as_slice(&self) -> &[T] {
    &self.0
  }
}

impl<T> From<T> for LocalGrads<T> {
  fn from(grad: T) -> Self {
    let mut grads = SmallVec::new();
    grads.push(grad);
    LocalGrads(grads)
  }
}

impl<T> From<(T, T)> for LocalGrads<T> {
  fn from((a, b): (T, T)) -> Self {
    let mut grads = SmallVec::new();
    grads.push(a);
    grads.push(b);
    LocalGrads(grads)
  }
}

impl<T> From<Vec<T>> for LocalGrads<T> {
  fn from(grads: Vec<T>) -> Self {
    LocalGrads(SmallVec::from_vec(grads))
  }
}

impl<T> IntoIterator for LocalGrads<T> {
  type Item = T;
  type IntoIter = smallvec::IntoIter<[T; 2]>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}

/// Anything `apply` accepts as an operand: a raw payload, which becomes a fresh
/// leaf, or a node already in the graph.
///
/// Raw payloads convert with `From` for the shipped payload types (`f64`,
/// `DMatrix<f64>`); other payloads use `Operand::Raw` directly.
#[derive(Debug, Clone)]
pub enum Operand<T: 'static> {
  Raw(T),
  Node(Var<T>),
}

impl<T: 'static> Operand<T> {
  /// Resolve into a graph node, wrapping raw payloads as leaves
  #[inline]
  pub fn into_var(self) -> Var<T> {
    match self {
      Operand::Raw(data) => Var::new(data),
      Operand::Node(var) => var,
    }
  }
}

impl<T: 'static> From<Var<T>> for Operand<T> {
  fn from(var: Var<T>) -> Self {
    Operand::Node(var)
  }
}

impl<T: 'static> From<&Var<T>> for Operand<T> {
  fn from(var: &Var<T>) -> Self {
    Operand::Node(var.clone())
  }
}

/// Run `function` forward over `operands` and record the result in the graph.
///
/// The returned node's parents have exactly the order and length of
/// `operands`; an operation's pullback must line up with that order. With
/// gradient recording disabled (see [`no_grad`](crate::no_grad)) the result is
/// a detached leaf instead.
///
/// Panics if the operand count does not match `function.arity()`.
pub fn apply<T, I>(function: &'static dyn Function<T>, operands: I) -> Var<T>
where
  T: Clone + 'static,
  I: IntoIterator<Item = Operand<T>>,
{
  let inputs: SmallVec<[Var<T>; 2]> = operands.into_iter().map(Operand::into_var).collect();
  assert_eq!(
    inputs.len(),
    function.arity(),
    "`{}` takes {} operands",
    function.name(),
    function.arity()
  );
  let raw: SmallVec<[T; 2]> = inputs.iter().map(|var| var.data().clone()).collect();

  if !mode::is_grad_enabled() {
    let mut ctx = Context::without_grad();
    return Var::new(function.forward(&mut ctx, &raw));
  }

  let mut ctx = Context::new();
  let data = function.forward(&mut ctx, &raw);
  let history = History::new(function, ctx, inputs);
  let var = Var::from_parts(data, Some(history));
  trace!(
    "{} = {}({})",
    var.id(),
    function.name(),
    DisplayIds(var.parents())
  );
  var
}

/// Comma separated node ids, for log lines
struct DisplayIds<'a, T: 'static>(&'a [Var<T>]);

impl<T: 'static> fmt::Display for DisplayIds<'_, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, var) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{}", var.id())?;
    }
    Ok(())
  }
}
