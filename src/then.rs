//! Continuation composition
//!
//! Given an asynchronous result and a continuation, these entry points build
//! a new asynchronous result holding the continuation's outcome, and register
//! a watched operation which runs the continuation once the input is ready.
//! The caller is never blocked: the continuation runs on the executor.
//!
//! The continuation receives the ready input result, on which `get()` returns
//! immediately, and decides what to do with a failed input. Inputs may be
//! single-reader `AsyncResult`s or `SharedAsyncResult`s, which lets several
//! continuations be scheduled on the same outcome. Three shapes of
//! continuation are supported, each with its own entry point:
//!
//! - `then()`: the continuation returns a plain value.
//! - `try_then()`: the continuation returns a `Result`, an `Err` becomes the
//!   error of the new result. Use `?` on the input to forward its failure.
//! - `then_flatten()`: the continuation returns another asynchronous result,
//!   shared or not, and the new result resolves to that nested result's value.
//!   There is only ever one level of wrapping.
//!
//! If the input is not ready before the time limit, the continuation is not
//! run and the new result fails with `Error::WaitTimedOut`. A panicking
//! continuation makes the new result fail with `Error::Panicked`.

use crate::all::AllReady;
use crate::client::{AsyncResult, Pollable};
use crate::defaults;
use crate::error::{Error, Result};
use crate::executor::{Executor, Rejected};
use crate::multithread::blocking::Promise;
use crate::server::AsyncProducer;
use crate::watched::{Deadline, Forward, WatchedOperation};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;


/// Time limit used when none is specified. Long, but not infinite.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(60 * 60);


/// Composition settings: which executor to use, and how long to wait
///
/// Both settings are optional. Without an explicit executor, the default
/// instance of `dyn Executor` is used (see the `defaults` module). Without an
/// explicit time limit, `DEFAULT_TIME_LIMIT` is used.
///
#[derive(Clone, Default)]
pub struct Chain {
    executor: Option<Arc<dyn Executor>>,
    time_limit: Option<Duration>,
}
//
impl Chain {
    /// Compose using the default executor and time limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose on a specific executor
    pub fn on(executor: Arc<dyn Executor>) -> Self {
        Chain { executor: Some(executor), time_limit: None }
    }

    /// Set the maximal time to wait for the input to become ready
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Run `cont` on `input` once ready, exposing its return value
    ///
    /// # Panics
    ///
    /// Panics if no executor was specified and no default one is installed.
    ///
    pub fn then<I, U, F>(&self,
                         input: I,
                         cont: F) -> Result<AsyncResult<U>, Rejected>
        where I: Pollable,
              U: Send + 'static,
              F: FnOnce(I) -> U + Send + 'static
    {
        self.try_then(input, move |ready| Ok(cont(ready)))
    }

    /// Run fallible `cont` on `input` once ready, exposing its outcome
    ///
    /// # Panics
    ///
    /// Panics if no executor was specified and no default one is installed.
    ///
    pub fn try_then<I, U, F>(&self,
                             input: I,
                             cont: F) -> Result<AsyncResult<U>, Rejected>
        where I: Pollable,
              U: Send + 'static,
              F: FnOnce(I) -> Result<U> + Send + 'static
    {
        let (output, result) = Promise::new().split();
        self.executor().watch(Box::new(WithContinuation {
            deadline: Deadline::new(self.limit()),
            input,
            output,
            cont,
        }))?;
        Ok(result)
    }

    /// Run `cont` on `input` once ready, then wait for the result it returns
    ///
    /// Both waits share the same time budget. If the input times out or the
    /// continuation panics, the nested result is never waited for.
    ///
    /// # Panics
    ///
    /// Panics if no executor was specified and no default one is installed.
    ///
    pub fn then_flatten<I, N, F>(&self,
                                 input: I,
                                 cont: F) -> Result<AsyncResult<N::Output>, Rejected>
        where I: Pollable,
              N: Pollable,
              F: FnOnce(I) -> N + Send + 'static
    {
        let executor = self.executor();
        let (output, result) = Promise::new().split();
        let operation: Box<WithChaining<I, N, F>> = Box::new(WithChaining {
            deadline: Deadline::new(self.limit()),
            executor: executor.clone(),
            input,
            output,
            cont,
        });
        executor.watch(operation)?;
        Ok(result)
    }

    /// Republish `input` as-is, failing if it is not ready in time
    ///
    /// # Panics
    ///
    /// Panics if no executor was specified and no default one is installed.
    ///
    pub fn forward<I>(&self,
                      input: I) -> Result<AsyncResult<I::Output>, Rejected>
        where I: Pollable
    {
        let (output, result) = Promise::new().split();
        self.executor().watch(Box::new(Forward::new(self.limit(),
                                                    input,
                                                    output)))?;
        Ok(result)
    }

    /// Run `cont` on all `inputs` once they are all ready
    ///
    /// # Panics
    ///
    /// Panics if no executor was specified and no default one is installed.
    ///
    pub fn all<I, U, F>(&self,
                        inputs: Vec<I>,
                        cont: F) -> Result<AsyncResult<U>, Rejected>
        where I: Pollable,
              U: Send + 'static,
              F: FnOnce(Vec<I>) -> U + Send + 'static
    {
        let (output, result) = Promise::new().split();
        self.executor().watch(Box::new(AllReady::new(Deadline::new(self.limit()),
                                                     inputs,
                                                     output,
                                                     cont)))?;
        Ok(result)
    }

    fn executor(&self) -> Arc<dyn Executor> {
        match self.executor {
            Some(ref executor) => executor.clone(),
            None => match defaults::current::<dyn Executor>() {
                Some(executor) => executor,
                None => panic!("no executor specified and no default executor \
                                installed"),
            },
        }
    }

    fn limit(&self) -> Duration {
        self.time_limit.unwrap_or(DEFAULT_TIME_LIMIT)
    }
}


/// Run `cont` on `input` once ready, using the default executor and limit
///
/// # Panics
///
/// Panics if no default executor is installed.
///
pub fn then<I, U, F>(input: I,
                     cont: F) -> Result<AsyncResult<U>, Rejected>
    where I: Pollable,
          U: Send + 'static,
          F: FnOnce(I) -> U + Send + 'static
{
    Chain::new().then(input, cont)
}

/// Fallible version of `then()`
///
/// # Panics
///
/// Panics if no default executor is installed.
///
pub fn try_then<I, U, F>(input: I,
                         cont: F) -> Result<AsyncResult<U>, Rejected>
    where I: Pollable,
          U: Send + 'static,
          F: FnOnce(I) -> Result<U> + Send + 'static
{
    Chain::new().try_then(input, cont)
}

/// Flattening version of `then()`
///
/// # Panics
///
/// Panics if no default executor is installed.
///
pub fn then_flatten<I, N, F>(input: I,
                             cont: F) -> Result<AsyncResult<N::Output>, Rejected>
    where I: Pollable,
          N: Pollable,
          F: FnOnce(I) -> N + Send + 'static
{
    Chain::new().then_flatten(input, cont)
}


/// Run a continuation, turning a panic into an error
pub(crate) fn run_continuation<A, U, F>(cont: F, arg: A) -> Result<U>
    where F: FnOnce(A) -> Result<U>
{
    panic::catch_unwind(AssertUnwindSafe(move || cont(arg)))
        .unwrap_or_else(|payload| Err(Error::from_panic(payload)))
}


/// Watched operation which stores a continuation's return value
struct WithContinuation<I, U, F> {
    deadline: Deadline,
    input: I,
    output: AsyncProducer<U>,
    cont: F,
}
//
impl<I, U, F> WatchedOperation for WithContinuation<I, U, F>
    where I: Pollable,
          U: Send,
          F: FnOnce(I) -> Result<U> + Send
{
    fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn probe(&mut self, slice: Duration) -> bool {
        self.input.wait_for(slice)
    }

    fn complete(self: Box<Self>, error: Option<Error>) {
        let WithContinuation { input, output, cont, .. } = *self;
        match error {
            Some(e) => output.set_error(e),
            None => output.set(run_continuation(cont, input)),
        }
    }
}


/// Watched operation which runs a continuation returning a nested result,
/// then watches that nested result under the same deadline
struct WithChaining<I, N: Pollable, F> {
    deadline: Deadline,
    executor: Arc<dyn Executor>,
    input: I,
    output: AsyncProducer<N::Output>,
    cont: F,
}
//
impl<I, N, F> WatchedOperation for WithChaining<I, N, F>
    where I: Pollable,
          N: Pollable,
          F: FnOnce(I) -> N + Send
{
    fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    fn probe(&mut self, slice: Duration) -> bool {
        self.input.wait_for(slice)
    }

    fn complete(self: Box<Self>, error: Option<Error>) {
        let WithChaining { deadline, executor, input, output, cont } = *self;
        if let Some(e) = error {
            output.set_error(e);
            return;
        }
        let nested = match run_continuation(move |ready| Ok(cont(ready)), input) {
            Ok(nested) => nested,
            Err(e) => {
                output.set_error(e);
                return;
            }
        };
        let stage2 = Forward::with_deadline(deadline, nested, output);
        if let Err(rejected) = executor.watch(Box::new(stage2)) {
            rejected.resolve();
        }
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::executor::inline::InlineExecutor;
    use crate::executor::polling::PollingExecutor;
    use crate::then::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;

    fn polling() -> Arc<dyn Executor> {
        Arc::new(PollingExecutor::new(Duration::from_millis(10)))
    }

    fn delayed<T: Send + 'static>(value: T, delay: Duration) -> AsyncResult<T> {
        AsyncResult::spawn(move || {
            thread::sleep(delay);
            value
        })
    }

    /// A continuation returning a value yields that value
    #[test]
    fn direct_value() {
        let chain = Chain::on(polling());
        let result = chain.then(AsyncResult::ready(42),
                                |r| r.get().unwrap().to_string())
                          .unwrap();
        assert_eq!(result.get().unwrap(), "42");
    }

    /// A continuation returning nothing still signals completion
    #[test]
    fn no_value() {
        let chain = Chain::on(polling());
        let calls = Arc::new(AtomicUsize::new(0));
        let c_calls = calls.clone();
        let result: AsyncResult<()> = chain.then(delayed(7, Duration::from_millis(5)),
                                                 move |r| {
            assert_eq!(r.get().unwrap(), 7);
            c_calls.fetch_add(1, Ordering::SeqCst);
        }).unwrap();
        result.get().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// A continuation returning a nested result is flattened
    #[test]
    fn flatten() {
        let chain = Chain::on(polling());
        let result: AsyncResult<String> =
            chain.then_flatten(AsyncResult::ready(42), |r| {
                let value = r.get().unwrap();
                delayed(value.to_string(), Duration::from_millis(20))
            }).unwrap();
        assert_eq!(result.get().unwrap(), "42");
    }

    /// Pipelines can be built out of successive continuations
    #[test]
    fn pipeline() {
        let chain = Chain::on(polling());
        let costs = chain.then(delayed((), Duration::from_millis(5)),
                               |_| 42.0f64)
                         .unwrap();
        let report = chain.try_then(costs, |c| Ok(format!("costs: {}", c.get()?)))
                          .unwrap();
        let shouted = chain.then_flatten(report, |r| {
            AsyncResult::spawn(move || r.get().map(|s| s.to_uppercase()))
        }).unwrap();
        assert_eq!(shouted.get().unwrap().unwrap(), "COSTS: 42");
    }

    /// Upstream failures reach the continuation, which can forward them
    #[test]
    fn upstream_failure() {
        let chain = Chain::on(polling());
        let result = chain.try_then(AsyncResult::<u32>::failed(Error::msg("upstream")),
                                    |r| Ok(r.get()? + 1))
                          .unwrap();
        match result.get() {
            Err(Error::Custom(e)) => assert_eq!(e.to_string(), "upstream"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// Errors returned by the continuation become the result's error
    #[test]
    fn continuation_failure() {
        let chain = Chain::on(polling());
        let result = chain.try_then(AsyncResult::ready(1),
                                    |_| -> Result<u32> { Err(Error::msg("nope")) })
                          .unwrap();
        assert!(matches!(result.get(), Err(Error::Custom(_))));
    }

    /// Panicking continuations fail their own result only
    #[test]
    fn continuation_panic() {
        let executor = polling();
        let chain = Chain::on(executor.clone());
        let bad = chain.then(AsyncResult::ready(1), |_| -> u32 { panic!("boom") })
                       .unwrap();
        let good = chain.then(AsyncResult::ready(2), |r| r.get().unwrap() * 2)
                        .unwrap();
        match bad.get() {
            Err(Error::Panicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(good.get().unwrap(), 4);
    }

    /// Inputs that are not ready in time make the result time out, and the
    /// continuation is never run
    #[test]
    fn timeout() {
        let chain = Chain::on(polling()).time_limit(Duration::from_millis(50));
        let (_never, input) = Promise::<u32>::new().split();
        let calls = Arc::new(AtomicUsize::new(0));
        let c_calls = calls.clone();
        let start = Instant::now();
        let result = chain.then(input, move |_| {
            c_calls.fetch_add(1, Ordering::SeqCst);
        }).unwrap();
        assert!(matches!(result.get(), Err(Error::WaitTimedOut { .. })));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// If the first stage fails, the nested stage is never created
    #[test]
    fn flatten_first_stage_failure() {
        let chain = Chain::on(polling()).time_limit(Duration::from_millis(30));
        let (_never, input) = Promise::<u32>::new().split();
        let calls = Arc::new(AtomicUsize::new(0));
        let c_calls = calls.clone();
        let result = chain.then_flatten(input, move |_| {
            c_calls.fetch_add(1, Ordering::SeqCst);
            AsyncResult::ready(0u32)
        }).unwrap();
        assert!(matches!(result.get(), Err(Error::WaitTimedOut { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let chain = Chain::on(polling());
        let result = chain.then_flatten(AsyncResult::ready(1),
                                        |_| -> AsyncResult<u32> { panic!("stage one") })
                          .unwrap();
        assert!(matches!(result.get(), Err(Error::Panicked(_))));
    }

    /// Failures of the nested result are forwarded unchanged, and the
    /// continuation is not run again because of them
    #[test]
    fn flatten_second_stage_failure() {
        let chain = Chain::on(polling());
        let calls = Arc::new(AtomicUsize::new(0));
        let c_calls = calls.clone();
        let result = chain.then_flatten(AsyncResult::ready(1), move |_| {
            c_calls.fetch_add(1, Ordering::SeqCst);
            AsyncResult::<u32>::failed(Error::msg("stage two"))
        }).unwrap();
        match result.get() {
            Err(Error::Custom(e)) => assert_eq!(e.to_string(), "stage two"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Several continuations can be scheduled on one shared result
    #[test]
    fn shared_input() {
        let chain = Chain::on(polling());
        let shared = delayed(20u32, Duration::from_millis(5)).share();
        let doubled = chain.then(shared.clone(), |r| r.get().unwrap() * 2)
                           .unwrap();
        let tripled = chain.try_then(shared.clone(), |r| Ok(r.get()? * 3))
                           .unwrap();
        assert_eq!(doubled.get().unwrap(), 40);
        assert_eq!(tripled.get().unwrap(), 60);
        assert_eq!(shared.get().unwrap(), 20);
    }

    /// Flattening works with shared inputs and shared nested results
    #[test]
    fn flatten_shared() {
        let chain = Chain::on(polling());
        let input = AsyncResult::ready("a".to_owned()).share();
        let (nested_producer, nested) = Promise::new().split();
        let nested = nested.share();
        let c_nested = nested.clone();
        let result = chain.then_flatten(input.clone(), move |r| {
            assert_eq!(r.get().unwrap(), "a");
            c_nested
        }).unwrap();

        thread::sleep(Duration::from_millis(10));
        assert!(!result.is_ready());
        nested_producer.set_value(5u64);
        assert_eq!(result.get().unwrap(), 5);
        assert_eq!(nested.get().unwrap(), 5);
        assert_eq!(input.get().unwrap(), "a");
    }

    /// Both flattening stages share one time budget
    #[test]
    fn flatten_shared_deadline() {
        let chain = Chain::on(polling()).time_limit(Duration::from_millis(60));
        let start = Instant::now();
        let result = chain.then_flatten(delayed(1, Duration::from_millis(30)), |_| {
            let (never, nested) = Promise::<u32>::new().split();
            std::mem::forget(never);
            nested
        }).unwrap();
        assert!(matches!(result.get(),
                         Err(Error::WaitTimedOut { limit })
                             if limit == Duration::from_millis(60)));
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    /// Continuations work on the inline executor too, synchronously
    #[test]
    fn inline_executor() {
        let chain = Chain::on(Arc::new(InlineExecutor::new(Duration::from_millis(1))));
        let result = chain.then_flatten(AsyncResult::ready(20), |r| {
            AsyncResult::ready(r.get().unwrap() + 1)
        }).unwrap();
        assert!(result.is_ready());
        assert_eq!(result.get().unwrap(), 21);
    }

    /// A stopped executor refuses compositions synchronously
    #[test]
    fn stopped_executor() {
        let executor = polling();
        executor.stop();
        let rejected = Chain::on(executor).then(AsyncResult::ready(1), |_| 2);
        assert!(matches!(rejected.map(|_| ()).unwrap_err().reason(),
                         Error::ExecutorStopped));
    }

    /// Stopping the executor between the two flattening stages fails the
    /// result instead of leaving it unset
    #[test]
    fn stop_between_stages() {
        let executor = Arc::new(PollingExecutor::new(Duration::from_millis(1)));
        let chain = Chain::on(executor.clone());
        let stopper = executor.clone();
        let result = chain.then_flatten(AsyncResult::ready(1), move |_| {
            // Ask for a stop from the worker itself: the nested stage can no
            // longer be registered
            stopper.stop();
            AsyncResult::ready(2)
        }).unwrap();
        assert!(matches!(result.get(), Err(Error::ExecutorStopped)));
    }

    /// Convenience entry points use the default executor, and panic without
    #[test]
    fn default_executor() {
        let missing = panic::catch_unwind(|| then(AsyncResult::ready(1), |_| 2));
        assert!(missing.is_err());

        let _default = defaults::set_scoped(polling());
        let doubled = then(AsyncResult::ready(21), |r| r.get().unwrap() * 2)
                          .unwrap();
        let checked = try_then(doubled, |r| r.get()).unwrap();
        let nested = then_flatten(checked, |r| {
            let value = r.get().unwrap();
            AsyncResult::spawn(move || value.to_string())
        }).unwrap();
        assert_eq!(nested.get().unwrap(), "42");

        let forwarded = Chain::new().time_limit(Duration::from_millis(20))
                                    .forward(Promise::<u8>::new().split().1)
                                    .unwrap();
        assert!(matches!(forwarded.get(), Err(Error::WaitTimedOut { .. })));
    }
}
