//!
//! Thread-local switch controlling whether `apply` records history.
//!

use std::cell::Cell;

thread_local! {
  static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Whether operations on this thread currently record history
#[inline]
pub fn is_grad_enabled() -> bool {
  GRAD_ENABLED.with(|enabled| enabled.get())
}

/// Restores the previous mode when dropped, unwinding included
struct ModeGuard {
  previous: bool,
}

impl ModeGuard {
  fn set(enabled: bool) -> Self {
    let previous = GRAD_ENABLED.with(|cell| cell.replace(enabled));
    Self { previous }
  }
}

impl Drop for ModeGuard {
  fn drop(&mut self) {
    GRAD_ENABLED.with(|cell| cell.set(self.previous));
  }
}

/// Run `f` without recording; every value produced inside is a detached leaf
/// and no context stores anything for a backward pass.
pub fn no_grad<F, R>(f: F) -> R
where
  F: FnOnce() -> R,
{
  let _guard = ModeGuard::set(false);
  f()
}
