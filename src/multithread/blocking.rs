//! Blocking write-once result slots
//!
//! This module provides the asynchronous result primitive which the rest of
//! the crate schedules continuations on. A result slot is shared between one
//! producer, which sets its outcome exactly once, and either one reader which
//! takes the outcome or any number of readers which copy it. Readers can
//! check for readiness with a bounded wait or block until the outcome is
//! there. Nothing in here ever calls back into user code: the slot is a
//! passive object, and continuations are driven from outside by an executor.

use crate::client::AsyncResult;
use crate::error::Result;
use crate::server::AsyncProducer;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};


/// Freshly created write-once result slot
pub struct Promise<T> {
    /// Server interface used to publish the outcome
    producer: AsyncProducer<T>,

    /// Client interface used to wait for the outcome
    result: AsyncResult<T>,
}
//
impl<T> Promise<T> {
    /// Create a new, pending result slot
    pub fn new() -> Self {
        let shared = Arc::new(SharedSlot::new());
        Promise {
            producer: AsyncProducer::new(shared.clone()),
            result: AsyncResult::new(shared),
        }
    }

    /// Split the slot into producer and reader objects, which can be
    /// respectively sent to the producing and consuming threads
    pub fn split(self) -> (AsyncProducer<T>, AsyncResult<T>) {
        (self.producer, self.result)
    }
}
//
impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}


/// State shared between the producer and the reader
pub(crate) struct SharedSlot<T> {
    /// Outcome of the operation, if any (mutex-protected)
    state: Mutex<SlotState<T>>,

    /// Condition variable used to notify the reader that the outcome is set
    ready_cv: Condvar,
}
//
impl<T> SharedSlot<T> {
    fn new() -> Self {
        SharedSlot {
            state: Mutex::new(SlotState::Pending),
            ready_cv: Condvar::new(),
        }
    }

    /// Publish the outcome and wake up the reader
    pub(crate) fn fulfill(&self, outcome: Result<T>) {
        let mut state = self.state.lock();
        debug_assert!(matches!(*state, SlotState::Pending),
                      "result slot was fulfilled twice");
        *state = SlotState::Ready(outcome);
        drop(state);
        self.ready_cv.notify_all();
    }

    /// Truth that an outcome has been published
    pub(crate) fn is_ready(&self) -> bool {
        !matches!(*self.state.lock(), SlotState::Pending)
    }

    /// Wait for the outcome for at most `timeout`, without consuming it
    pub(crate) fn wait_for(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, SlotState::Pending) {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }

        // A timeout too large to be represented amounts to no timeout at all
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                while matches!(*state, SlotState::Pending) {
                    self.ready_cv.wait(&mut state);
                }
                return true;
            }
        };

        // Spurious wakeups are possible, hence the loop
        while matches!(*state, SlotState::Pending) {
            if self.ready_cv.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        !matches!(*state, SlotState::Pending)
    }

    /// Block until the outcome is there
    pub(crate) fn wait(&self) {
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            self.ready_cv.wait(&mut state);
        }
    }

    /// Block until the outcome is there, then copy it
    pub(crate) fn peek(&self) -> Result<T>
        where T: Clone
    {
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            self.ready_cv.wait(&mut state);
        }
        match &*state {
            SlotState::Ready(outcome) => outcome.clone(),
            SlotState::Pending | SlotState::Taken => {
                unreachable!("shared outcomes are never taken")
            }
        }
    }

    /// Block until the outcome is there, then take it
    pub(crate) fn take(&self) -> Result<T> {
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            self.ready_cv.wait(&mut state);
        }
        match std::mem::replace(&mut *state, SlotState::Taken) {
            SlotState::Ready(outcome) => outcome,
            SlotState::Pending | SlotState::Taken => {
                unreachable!("only the single reader takes the outcome")
            }
        }
    }
}


/// Lifecycle of a result slot
enum SlotState<T> {
    /// The producer has not published anything yet
    Pending,

    /// The outcome is available to the reader
    Ready(Result<T>),

    /// The reader has retrieved the outcome
    Taken,
}
