//! Cooperative scheduling hooks: progress callbacks are invoked once per
//! generation / step, and cancellation is polled at fixed yield intervals,
//! independent of any particular concurrency primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation flag shared with the host. Solvers poll it at their yield
/// points (every 5 generations, every 10 gradient steps) and finalize early
/// with the current best layout when set.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
