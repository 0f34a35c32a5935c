//! Cooperative interruption flag shared between a controller, its callers and running nodes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable handle; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
  flag: Arc<AtomicBool>,
}

impl InterruptHandle {
  pub fn new() -> Self {
    Self::default()
  }

  /// Requests a stop at the next node boundary. Idempotent.
  pub fn interrupt(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn is_interrupted(&self) -> bool {
    self.flag.load(Ordering::SeqCst)
  }

  /// Re-arms the flag at the start of a run.
  pub(crate) fn reset(&self) {
    self.flag.store(false, Ordering::SeqCst);
  }
}
