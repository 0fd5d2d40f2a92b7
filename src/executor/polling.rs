//! Background polling executor
//!
//! This executor owns one worker thread which repeatedly goes through the
//! set of watched operations, granting each of them a small bounded wait
//! (the polling slice) to become ready. Operations that are ready, or whose
//! deadline has elapsed, are completed and dropped from the set. Clients
//! register new operations concurrently with a short-held lock, and are
//! never blocked by the polling itself.
//!
//! Operations are probed in registration order, so none of them waits more
//! than one slice per other active operation between two probes. Completion
//! order follows readiness, not registration.

use crate::config::ExecutorConfig;
use crate::error::Error;
use crate::executor::{self, Executor, Progress, Rejected, Settlement};
use crate::multithread::polling::{StatusBoard, StatusMonitor, StatusPublisher};
use crate::status::{self, ExecutorStatus, Lifecycle};
use crate::watched::WatchedOperation;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, trace};


/// Executor which polls watched operations from a background thread
///
/// The worker is spawned on the first registration, or by an explicit call
/// to `start()`. Dropping the executor stops it.
///
pub struct PollingExecutor {
    /// State shared with the worker thread
    shared: Arc<Shared>,

    /// Join handle of the worker, once spawned
    worker: Mutex<Option<JoinHandle<()>>>,

    /// Latest activity snapshot published by the worker
    monitor: Mutex<StatusMonitor>,
}
//
impl PollingExecutor {
    /// Create an executor with the given polling slice
    ///
    /// # Panics
    ///
    /// Panics if `poll_slice` is zero.
    ///
    pub fn new(poll_slice: Duration) -> Self {
        Self::with_config(ExecutorConfig::new().poll_slice(poll_slice))
    }

    /// Create an executor from a full configuration
    pub fn with_config(config: ExecutorConfig) -> Self {
        let (publisher, monitor) = StatusBoard::new(&status::CREATED).split();
        PollingExecutor {
            shared: Arc::new(Shared {
                config,
                queues: Mutex::new(Queues {
                    lifecycle: Lifecycle::Created,
                    pending: Vec::new(),
                    publisher: Some(publisher),
                    worker_id: None,
                }),
                wakeup_cv: Condvar::new(),
                stopped_cv: Condvar::new(),
            }),
            worker: Mutex::new(None),
            monitor: Mutex::new(monitor),
        }
    }

    /// Configuration of this executor
    pub fn config(&self) -> &ExecutorConfig {
        &self.shared.config
    }

    /// Spawn the worker thread, if that was not done already
    ///
    /// Fails if the executor was stopped, or if the thread cannot be spawned.
    ///
    pub fn start(&self) -> Result<(), Error> {
        let mut queues = self.shared.queues.lock();
        self.start_locked(&mut queues)
    }

    /// Latest activity snapshot published by the worker
    pub fn status(&self) -> ExecutorStatus {
        self.monitor.lock().status().clone()
    }

    /// Current lifecycle state, as seen by registrations
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.queues.lock().lifecycle
    }

    fn start_locked(&self, queues: &mut Queues) -> Result<(), Error> {
        match queues.lifecycle {
            Lifecycle::Created => {}
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopping | Lifecycle::Stopped => {
                return Err(Error::ExecutorStopped)
            }
        }
        let publisher = match queues.publisher.take() {
            Some(publisher) => publisher,
            None => return Err(Error::ExecutorStopped),
        };

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(self.shared.config.thread_name.clone())
            .spawn(move || run_worker(shared, publisher));
        match spawned {
            Ok(handle) => {
                queues.lifecycle = Lifecycle::Running;
                queues.worker_id = Some(handle.thread().id());
                *self.worker.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                // Without its status publisher, this executor cannot be
                // restarted: give up on it
                error!(%e, "failed to spawn executor worker");
                queues.lifecycle = Lifecycle::Stopped;
                self.shared.stopped_cv.notify_all();
                Err(Error::Spawn(Arc::new(e)))
            }
        }
    }
}
//
impl Executor for PollingExecutor {
    fn watch(&self, operation: Box<dyn WatchedOperation>) -> Result<(), Rejected> {
        let mut queues = self.shared.queues.lock();
        if !status::accepts_operations(queues.lifecycle) {
            return Err(Rejected::new(Error::ExecutorStopped, operation));
        }
        if let Err(e) = self.start_locked(&mut queues) {
            return Err(Rejected::new(e, operation));
        }
        queues.pending.push(operation);
        drop(queues);
        self.shared.wakeup_cv.notify_one();
        Ok(())
    }

    fn stop(&self) {
        let worker_id = {
            let mut queues = self.shared.queues.lock();
            match queues.lifecycle {
                Lifecycle::Created => {
                    queues.lifecycle = Lifecycle::Stopped;
                    if let Some(mut publisher) = queues.publisher.take() {
                        publisher.publish(ExecutorStatus {
                            lifecycle: Lifecycle::Stopped,
                            ..status::CREATED
                        });
                    }
                    debug!("executor stopped before it was started");
                    return;
                }
                Lifecycle::Running => {
                    debug!("executor stop requested");
                    queues.lifecycle = Lifecycle::Stopping;
                }
                Lifecycle::Stopping | Lifecycle::Stopped => {}
            }
            queues.worker_id
        };
        self.shared.wakeup_cv.notify_all();

        // A continuation may stop its own executor. The worker will notice
        // the request once that continuation returns, it cannot be awaited.
        if worker_id == Some(thread::current().id()) {
            return;
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("executor worker panicked");
                self.shared.mark_stopped();
            }
        }

        // Concurrent callers of stop() wait for the worker's exit as well
        self.shared.wait_stopped();
    }
}
//
impl Drop for PollingExecutor {
    fn drop(&mut self) {
        self.stop();
    }
}


/// State shared between the executor handle and its worker
struct Shared {
    /// Worker settings
    config: ExecutorConfig,

    /// Registration queue and lifecycle (mutex-protected)
    queues: Mutex<Queues>,

    /// Notified on new registrations and on stop requests
    wakeup_cv: Condvar,

    /// Notified when the worker reaches the Stopped state
    stopped_cv: Condvar,
}
//
impl Shared {
    /// Enter the final lifecycle state and release waiting stop() callers
    fn mark_stopped(&self) {
        self.queues.lock().lifecycle = Lifecycle::Stopped;
        self.stopped_cv.notify_all();
    }

    /// Block until the final lifecycle state is reached
    fn wait_stopped(&self) {
        let mut queues = self.queues.lock();
        while queues.lifecycle != Lifecycle::Stopped {
            self.stopped_cv.wait(&mut queues);
        }
    }
}
//
struct Queues {
    /// Lifecycle state, authoritative for registrations
    lifecycle: Lifecycle,

    /// Operations registered since the worker last looked
    pending: Vec<Box<dyn WatchedOperation>>,

    /// Status publisher, until it is handed over to the worker
    publisher: Option<StatusPublisher>,

    /// Identifier of the worker thread, once spawned
    worker_id: Option<ThreadId>,
}


/// Main loop of the worker thread
fn run_worker(shared: Arc<Shared>, mut publisher: StatusPublisher) {
    let slice = shared.config.poll_slice;
    let mut active: VecDeque<Box<dyn WatchedOperation>> = VecDeque::new();
    let mut status = ExecutorStatus {
        lifecycle: Lifecycle::Running,
        ..status::CREATED
    };
    publisher.publish(status.clone());
    debug!(?slice, "executor worker started");

    'polling: loop {
        // Merge new registrations, or park until there are some
        {
            let mut queues = shared.queues.lock();
            if queues.lifecycle == Lifecycle::Stopping {
                active.extend(queues.pending.drain(..));
                break 'polling;
            }
            if active.is_empty() && queues.pending.is_empty() {
                shared.wakeup_cv.wait_for(&mut queues, shared.config.idle_wait);
                continue 'polling;
            }
            active.extend(queues.pending.drain(..));
        }

        // Give each active operation one polling slice
        for _ in 0..active.len() {
            if shared.queues.lock().lifecycle == Lifecycle::Stopping {
                break;
            }
            let operation = match active.pop_front() {
                Some(operation) => operation,
                None => break,
            };
            match executor::poll_once(operation, slice) {
                Progress::Dispatched => {
                    trace!("watched operation dispatched");
                    status.dispatched += 1;
                }
                Progress::TimedOut => {
                    debug!("watched operation timed out");
                    status.timed_out += 1;
                }
                Progress::Pending(operation) => active.push_back(operation),
            }
        }
        status.active = active.len();
        publisher.publish(status.clone());
    }

    // Resolve whatever is left. Registrations are refused from now on, so
    // continuations which try to chain more work get a stop error instead.
    status.lifecycle = Lifecycle::Stopping;
    status.active = active.len();
    publisher.publish(status.clone());
    debug!(outstanding = active.len(), "executor worker stopping");
    for operation in active.drain(..) {
        match executor::resolve_on_stop(operation) {
            Settlement::Dispatched => status.dispatched += 1,
            Settlement::TimedOut => status.timed_out += 1,
            Settlement::Stopped => status.stopped += 1,
        }
    }

    status.lifecycle = Lifecycle::Stopped;
    status.active = 0;
    publisher.publish(status);
    shared.mark_stopped();
    debug!("executor worker stopped");
}
