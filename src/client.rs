//! Reader side of an asynchronous result
//!
//! An `AsyncResult` is a passive handle: it does not run callbacks, it can
//! only be asked whether the outcome is there (optionally waiting a bounded
//! amount of time for it), or be consumed to retrieve the outcome. Scheduling
//! work once a result is ready is the job of an `Executor`, see the `then`
//! module for the composition entry points.
//!
//! An `AsyncResult` has a single reader. When several parties are interested
//! in the same outcome, `share()` turns it into a `SharedAsyncResult`, which
//! can be cloned freely and hands out copies of the outcome. Both kinds of
//! reader implement `Pollable`, which is what continuations are scheduled on.

use crate::error::{Error, Result};
use crate::multithread::blocking::{Promise, SharedSlot};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;


/// Read handle to a value (or error) which is produced exactly once
pub struct AsyncResult<T> {
    /// Slot shared with the producer
    shared: Arc<SharedSlot<T>>,
}
//
impl<T> AsyncResult<T> {
    /// Wrap a freshly created, pending slot
    pub(crate) fn new(shared: Arc<SharedSlot<T>>) -> Self {
        AsyncResult { shared }
    }

    /// Build a result which is already available
    pub fn ready(value: T) -> Self {
        let (producer, result) = Promise::new().split();
        producer.set_value(value);
        result
    }

    /// Build a result which has already failed
    pub fn failed(error: Error) -> Self {
        let (producer, result) = Promise::new().split();
        producer.set_error(error);
        result
    }

    /// Check whether the outcome is available, without blocking
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    /// Wait at most `timeout` for the outcome to become available
    ///
    /// Returns true if it is available. The outcome is left in place, so this
    /// can be called any number of times before `get()`.
    ///
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.shared.wait_for(timeout)
    }

    /// Wait for the outcome to become available, however long that takes
    pub fn wait(&self) {
        self.shared.wait()
    }

    /// Wait for the outcome and retrieve it
    pub fn get(self) -> Result<T> {
        self.shared.take()
    }

    /// Turn this result into one that any number of readers can access
    pub fn share(self) -> SharedAsyncResult<T> {
        SharedAsyncResult { shared: self.shared }
    }
}
//
impl<T: Send + 'static> AsyncResult<T> {
    /// Run `task` on a dedicated thread and expose its return value
    ///
    /// A panic inside of `task` is reported as `Error::Panicked`. If the
    /// thread cannot be spawned, the result fails with `Error::Spawn`.
    ///
    pub fn spawn<F>(task: F) -> Self
        where F: FnOnce() -> T + Send + 'static
    {
        let (producer, result) = Promise::new().split();
        let spawned = thread::Builder::new().spawn(move || {
            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(value) => producer.set_value(value),
                Err(payload) => producer.set_error(Error::from_panic(payload)),
            }
        });
        match spawned {
            Ok(_) => result,
            Err(e) => AsyncResult::failed(Error::Spawn(Arc::new(e))),
        }
    }
}


/// Read handle to an outcome which many readers can access
///
/// Every clone refers to the same slot, and `get()` hands out a copy of the
/// outcome to each caller.
///
pub struct SharedAsyncResult<T> {
    /// Slot shared with the producer and the other readers
    shared: Arc<SharedSlot<T>>,
}
//
impl<T> SharedAsyncResult<T> {
    /// Check whether the outcome is available, without blocking
    pub fn is_ready(&self) -> bool {
        self.shared.is_ready()
    }

    /// Wait at most `timeout` for the outcome to become available
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.shared.wait_for(timeout)
    }

    /// Wait for the outcome to become available, however long that takes
    pub fn wait(&self) {
        self.shared.wait()
    }
}
//
impl<T: Clone> SharedAsyncResult<T> {
    /// Wait for the outcome and retrieve a copy of it
    pub fn get(&self) -> Result<T> {
        self.shared.peek()
    }
}
//
impl<T> Clone for SharedAsyncResult<T> {
    fn clone(&self) -> Self {
        SharedAsyncResult { shared: self.shared.clone() }
    }
}


/// Asynchronous result which continuations can be scheduled on
///
/// `wait_for()` may be called any number of times, and must leave the
/// outcome in place for `retrieve()`.
///
pub trait Pollable: Send + 'static {
    /// Type of the value held by the result
    type Output: Send + 'static;

    /// Wait at most `timeout` for the outcome to become available
    fn wait_for(&self, timeout: Duration) -> bool;

    /// Wait for the outcome and retrieve it
    fn retrieve(self) -> Result<Self::Output>;
}
//
impl<T: Send + 'static> Pollable for AsyncResult<T> {
    type Output = T;

    fn wait_for(&self, timeout: Duration) -> bool {
        self.shared.wait_for(timeout)
    }

    fn retrieve(self) -> Result<T> {
        self.get()
    }
}
//
impl<T: Clone + Send + 'static> Pollable for SharedAsyncResult<T> {
    type Output = T;

    fn wait_for(&self, timeout: Duration) -> bool {
        self.shared.wait_for(timeout)
    }

    fn retrieve(self) -> Result<T> {
        self.get()
    }
}
