//! Inline executor, implementing synchronous operation dispatch
//!
//! This executor drives each watched operation to completion directly on the
//! thread that registers it, before `watch()` returns. It can block its
//! caller for as long as the operation's time limit, so it should never be
//! used where registration must be fast, but in tests and single-threaded
//! programs its determinism is welcome: once `then()` returns, the
//! continuation has run.

use crate::error::Error;
use crate::executor::{self, Executor, Progress, Rejected};
use crate::watched::WatchedOperation;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;


/// Executor implementation suitable for inline operation dispatch
pub struct InlineExecutor {
    /// Bounded wait used on each probe
    poll_slice: Duration,

    /// Set once stop() has been called
    stopped: AtomicBool,
}
//
impl InlineExecutor {
    /// Create a new inline executor
    pub fn new(poll_slice: Duration) -> Self {
        InlineExecutor {
            poll_slice,
            stopped: AtomicBool::new(false),
        }
    }
}
//
impl Default for InlineExecutor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_POLL_SLICE)
    }
}
//
impl Executor for InlineExecutor {
    fn watch(&self, operation: Box<dyn WatchedOperation>) -> Result<(), Rejected> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(Rejected::new(Error::ExecutorStopped, operation));
        }
        let mut operation = operation;
        loop {
            match executor::poll_once(operation, self.poll_slice) {
                Progress::Pending(pending) => operation = pending,
                Progress::Dispatched | Progress::TimedOut => return Ok(()),
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }
}
