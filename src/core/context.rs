use smallvec::SmallVec;

use crate::error::{GraphError, Result};

/// Scratch record handed to an operation's forward pass, and back to its
/// backward pass; holds whatever the forward step decided the pullback needs.
///
/// A context belongs to exactly one recorded operation and is never touched
/// again once the forward call returns.
#[derive(Debug, Clone)]
pub struct Context<T> {
  no_grad: bool,
  saved_values: SmallVec<[T; 2]>,
}

impl<T> Context<T> {
  pub fn new() -> Self {
    Self {
      no_grad: false,
      saved_values: SmallVec::new(),
    }
  }

  /// A context that silently drops everything passed to `save_for_backward`
  pub fn without_grad() -> Self {
    Self {
      no_grad: true,
      saved_values: SmallVec::new(),
    }
  }

  #[inline]
  pub fn no_grad(&self) -> bool {
    self.no_grad
  }

  /// Store `values` for the backward pass, replacing anything saved earlier;
  /// a no-op when gradients are not required
  #[inline]
  pub fn save_for_backward<I>(&mut self, values: I)
  where
    I: IntoIterator<Item = T>,
  {
    if self.no_grad {
      return;
    }
    self.saved_values = values.into_iter().collect();
  }

  /// Whatever was saved last, empty if nothing was
  #[inline]
  pub fn saved_values(&self) -> &[T] {
    &self.saved_values
  }

  /// Borrow exactly `N` saved values, for destructuring in a pullback...
  ///
  /// ```ignore
  /// let [a, b] = ctx.saved::<2>("mul")?;
  /// ```
  pub fn saved<const N: usize>(&self, function: &'static str) -> Result<&[T; N]> {
    <&[T; N]>::try_from(self.saved_values.as_slice()).map_err(|_| {
      GraphError::MissingSavedValues {
        function,
        expected: N,
        actual: self.saved_values.len(),
      }
    })
  }
}

impl<T> Default for Context<T> {
  fn default() -> Self {
    Self::new()
  }
}
