//! Units of work scheduled by an executor
//!
//! A watched operation pairs an asynchronous result to poll with a producer
//! to complete once that result is ready. The executor knows nothing about
//! the value types involved: all it does is repeatedly offer each operation a
//! bounded slice of time to become ready, and then call `complete()` exactly
//! once, either because the operation reported readiness or because its
//! deadline elapsed.

use crate::client::Pollable;
use crate::error::Error;
use crate::server::AsyncProducer;
use std::time::{Duration, Instant};


/// Pending asynchronous work which an executor polls and dispatches
///
/// Implementations must uphold the following contract:
///
/// - `probe()` waits at most `slice` and reports whether the underlying
///   result is ready. It may be called any number of times and must not
///   consume the result.
/// - `complete()` is called exactly once, after `probe()` returned true or
///   after the deadline elapsed. Taking `self` by box enforces this.
/// - `complete()` writes its outcome only into its own producer.
///
pub trait WatchedOperation: Send {
    /// Point in time after which the executor gives up waiting
    fn deadline(&self) -> &Deadline;

    /// Wait at most `slice` for the operation to become ready
    fn probe(&mut self, slice: Duration) -> bool;

    /// Produce the outcome
    ///
    /// `error` is `None` if the operation became ready. Otherwise, it is the
    /// reason why the executor gave up on the operation, which should be
    /// forwarded to the producer without waiting any further.
    ///
    fn complete(self: Box<Self>, error: Option<Error>);
}


/// Time budget of a watched operation
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    /// When the operation started being watched
    start: Instant,

    /// Total time the operation may spend waiting
    limit: Duration,
}
//
impl Deadline {
    /// Start a new time budget, right now
    pub fn new(limit: Duration) -> Self {
        Deadline { start: Instant::now(), limit }
    }

    /// Total time budget
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Time spent since the budget was started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left before expiry, zero if already expired
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    /// Truth that the time budget was exceeded
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.limit
    }

    /// Error reported on expiry
    pub fn timeout_error(&self) -> Error {
        Error::WaitTimedOut { limit: self.limit }
    }
}


/// Watched operation which republishes a result, as-is, into a producer
///
/// This is what bounds the wait on an existing result, and what the second
/// stage of a flattening continuation boils down to. The input may be either
/// a single-reader or a shared result.
///
pub struct Forward<I: Pollable> {
    deadline: Deadline,
    input: I,
    output: AsyncProducer<I::Output>,
}
//
impl<I: Pollable> Forward<I> {
    /// Forward `input` into `output` within `time_limit`
    pub fn new(time_limit: Duration,
               input: I,
               output: AsyncProducer<I::Output>) -> Self {
        Self::with_deadline(Deadline::new(time_limit), input, output)
    }

    /// Forward `input` into `output`, sharing an already running budget
    pub fn with_deadline(deadline: Deadline,
                         input: I,
                         output: AsyncProducer<I::Output>) -> Self {
        Forward { deadline, input, output }
    }
}
//
impl<I: Pollable> WatchedOperation for Forward<I> {
    fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn probe(&mut self, slice: Duration) -> bool {
        self.input.wait_for(slice)
    }

    fn complete(self: Box<Self>, error: Option<Error>) {
        let Forward { input, output, .. } = *self;
        match error {
            Some(e) => output.set_error(e),
            None => output.set(input.retrieve()),
        }
    }
}
