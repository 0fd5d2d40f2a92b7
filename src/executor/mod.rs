//! Executors of watched operations
//!
//! Asynchronous results in this crate are passive: nothing happens when they
//! become ready, someone has to notice. An executor is the component in
//! charge of noticing. Clients register watched operations with it, and it
//! makes sure that each of them is eventually completed, either because the
//! underlying result became ready or because its deadline elapsed.
//!
//! Two executors are provided:
//!
//! - The polling executor owns a background worker thread which polls every
//!   registered operation in turn, using a small bounded wait on each. This
//!   is the one to use in general, registration never blocks.
//! - The inline executor drives each operation to completion directly on the
//!   registering thread. It blocks, but is fully deterministic, which makes
//!   it handy in tests and in single-threaded programs.

pub mod inline;
pub mod polling;

use crate::error::Error;
use crate::watched::WatchedOperation;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;
use tracing::{trace, warn};


/// Component that eventually completes watched operations
pub trait Executor: Send + Sync {
    /// Watch an operation and eventually complete it
    ///
    /// An operation that cannot be accepted (typically because the executor
    /// was stopped) is handed back to the caller, untouched.
    ///
    fn watch(&self, operation: Box<dyn WatchedOperation>) -> Result<(), Rejected>;

    /// Stop the executor
    ///
    /// Every outstanding operation is resolved before this returns, operations
    /// which are not ready yet being completed with `Error::ExecutorStopped`.
    /// Calling this more than once is harmless.
    ///
    fn stop(&self);
}


/// Registration refused by an executor
#[derive(Error)]
#[error("watched operation rejected: {reason}")]
pub struct Rejected {
    /// Why the operation was refused
    reason: Error,

    /// The operation, which was neither probed nor completed
    operation: Box<dyn WatchedOperation>,
}
//
impl Rejected {
    pub(crate) fn new(reason: Error,
                      operation: Box<dyn WatchedOperation>) -> Self {
        Rejected { reason, operation }
    }

    /// Why the operation was refused
    pub fn reason(&self) -> &Error {
        &self.reason
    }

    /// Take the operation back
    pub fn into_operation(self) -> Box<dyn WatchedOperation> {
        self.operation
    }

    /// Complete the operation with the rejection reason as its error
    pub fn resolve(self) {
        let Rejected { reason, operation } = self;
        complete(operation, Some(reason));
    }
}
//
impl fmt::Debug for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rejected")
         .field("reason", &self.reason)
         .finish_non_exhaustive()
    }
}


/// What became of an operation after it was polled once
pub(crate) enum Progress {
    /// The operation became ready and was completed
    Dispatched,

    /// The deadline elapsed and the operation was completed with a timeout
    TimedOut,

    /// The operation is still pending and must be polled again
    Pending(Box<dyn WatchedOperation>),
}


/// Offer one polling slice to an operation, completing it if it is done
///
/// The slice never extends past the operation's deadline. A panic during the
/// probe or the completion only affects this operation: it is logged, and
/// whatever the operation's producer did not publish gets reported to its
/// reader as an error.
///
pub(crate) fn poll_once(mut operation: Box<dyn WatchedOperation>,
                        slice: Duration) -> Progress {
    let slice = slice.min(operation.deadline().remaining());
    match panic::catch_unwind(AssertUnwindSafe(|| operation.probe(slice))) {
        Ok(true) => {
            complete(operation, None);
            Progress::Dispatched
        }
        Ok(false) if operation.deadline().is_expired() => {
            let error = operation.deadline().timeout_error();
            trace!(limit = ?operation.deadline().limit(),
                   "watched operation timed out");
            complete(operation, Some(error));
            Progress::TimedOut
        }
        Ok(false) => Progress::Pending(operation),
        Err(payload) => {
            let error = Error::from_panic(payload);
            warn!(%error, "watched operation panicked while probed");
            complete(operation, Some(error));
            Progress::Dispatched
        }
    }
}


/// How an operation was resolved on executor shutdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// The operation was ready after all
    Dispatched,

    /// The deadline had already elapsed
    TimedOut,

    /// The operation was completed with `Error::ExecutorStopped`
    Stopped,
}


/// Resolve an operation on executor shutdown, without waiting for it
pub(crate) fn resolve_on_stop(operation: Box<dyn WatchedOperation>) -> Settlement {
    match poll_once(operation, Duration::from_millis(0)) {
        Progress::Dispatched => Settlement::Dispatched,
        Progress::TimedOut => Settlement::TimedOut,
        Progress::Pending(operation) => {
            complete(operation, Some(Error::ExecutorStopped));
            Settlement::Stopped
        }
    }
}


/// Complete an operation, isolating the caller from panics
fn complete(operation: Box<dyn WatchedOperation>, error: Option<Error>) {
    let completed = panic::catch_unwind(AssertUnwindSafe(move || {
        operation.complete(error)
    }));
    if let Err(payload) = completed {
        let error = Error::from_panic(payload);
        warn!(%error, "watched operation panicked while completing");
    }
}
