//! Explicit Active/Disposed lifecycle.
//!
//! Accessors guard with `ensure_active` and return an error once disposed
//! instead of panicking from implicit state.

use crate::error::{ClusterError, ClusterResult};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Lifecycle {
    disposed: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_active(&self) -> ClusterResult<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ClusterError::Disposed);
        }
        Ok(())
    }

    /// Returns true on the first call, false on repeats.
    pub fn dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
