//! Producer side of an asynchronous result
//!
//! The producer is the write-once half of a result slot. Whoever owns it is
//! in charge of eventually publishing either a value or an error, and every
//! publishing method consumes the producer, so a result can never be set
//! twice.
//!
//! If the producer is dropped before it has published anything, the reader
//! is notified with a `BrokenPromise` error so that it cannot hang forever.

use crate::error::{Error, Result};
use crate::multithread::blocking::SharedSlot;
use std::sync::Arc;


/// Write-once handle used to complete an `AsyncResult`
pub struct AsyncProducer<T> {
    /// Slot shared with the reader. Emptied once the outcome is published.
    shared: Option<Arc<SharedSlot<T>>>,
}
//
impl<T> AsyncProducer<T> {
    /// Wrap a freshly created, pending slot
    pub(crate) fn new(shared: Arc<SharedSlot<T>>) -> Self {
        AsyncProducer { shared: Some(shared) }
    }

    /// Publish a successful outcome
    pub fn set_value(self, value: T) {
        self.set(Ok(value))
    }

    /// Publish a failed outcome
    pub fn set_error(self, error: Error) {
        self.set(Err(error))
    }

    /// Publish an outcome, whichever it is
    pub fn set(mut self, outcome: Result<T>) {
        if let Some(shared) = self.shared.take() {
            shared.fulfill(outcome);
        }
    }
}
//
impl<T> Drop for AsyncProducer<T> {
    /// If the producer is dropped before publishing an outcome, notify the
    /// reader in order to prevent it from hanging
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.fulfill(Err(Error::BrokenPromise));
        }
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::multithread::blocking::Promise;
    use std::thread;

    /// Check that producers can publish from another thread
    #[test]
    fn send_to_thread() {
        let (producer, result) = Promise::new().split();
        let worker = thread::spawn(move || producer.set_value(vec![1, 2, 3]));
        assert_eq!(result.get().unwrap(), vec![1, 2, 3]);
        worker.join().unwrap();
    }

    /// Check that the drop guard does not clobber a published outcome
    #[test]
    fn no_broken_promise_after_set() {
        let (producer, result) = Promise::new().split();
        producer.set(Ok(5i64));
        assert_eq!(result.get().unwrap(), 5);
    }

    /// Check that a producer lost during a panic still releases the reader
    #[test]
    fn broken_promise_on_unwind() {
        let (producer, result) = Promise::<u8>::new().split();
        let worker = thread::spawn(move || {
            let _producer = producer;
            panic!("worker died");
        });
        assert!(worker.join().is_err());
        assert!(matches!(result.get(), Err(Error::BrokenPromise)));
    }
}
