//! Aggregate composition
//!
//! Combines a collection of asynchronous results into one, which completes
//! once all inputs are ready by running a continuation on the whole
//! collection. The inputs are handed over in their original order, each of
//! them holding either a value or an error. Shared results can be combined
//! as well.

use crate::client::{AsyncResult, Pollable};
use crate::error::{Error, Result};
use crate::executor::Rejected;
use crate::server::AsyncProducer;
use crate::then::{self, Chain};
use crate::watched::{Deadline, WatchedOperation};
use std::time::{Duration, Instant};


/// Run `cont` on all `inputs` once ready, using the default executor and limit
///
/// # Panics
///
/// Panics if no default executor is installed.
///
pub fn all<I, U, F>(inputs: Vec<I>,
                    cont: F) -> Result<AsyncResult<U>, Rejected>
    where I: Pollable,
          U: Send + 'static,
          F: FnOnce(Vec<I>) -> U + Send + 'static
{
    Chain::new().all(inputs, cont)
}


/// Watched operation which waits for a whole collection of results
pub(crate) struct AllReady<I, U, F> {
    deadline: Deadline,
    inputs: Vec<I>,

    /// Inputs before this index are known to be ready
    ready: usize,

    output: AsyncProducer<U>,
    cont: F,
}
//
impl<I, U, F> AllReady<I, U, F> {
    pub(crate) fn new(deadline: Deadline,
                      inputs: Vec<I>,
                      output: AsyncProducer<U>,
                      cont: F) -> Self {
        AllReady { deadline, inputs, ready: 0, output, cont }
    }
}
//
impl<I, U, F> WatchedOperation for AllReady<I, U, F>
    where I: Pollable,
          U: Send,
          F: FnOnce(Vec<I>) -> U + Send
{
    fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    // The whole collection shares one slice per probe
    fn probe(&mut self, slice: Duration) -> bool {
        let start = Instant::now();
        while let Some(input) = self.inputs.get(self.ready) {
            if !input.wait_for(slice.saturating_sub(start.elapsed())) {
                return false;
            }
            self.ready += 1;
        }
        true
    }

    fn complete(self: Box<Self>, error: Option<Error>) {
        let AllReady { inputs, output, cont, .. } = *self;
        match error {
            Some(e) => output.set_error(e),
            None => output.set(then::run_continuation(move |ready| Ok(cont(ready)),
                                                      inputs)),
        }
    }
}
