//! Facilities to represent the status of an executor
//!
//! An executor goes through a simple state machine over its lifetime: it is
//! created idle, starts running when its worker thread is spawned, is asked
//! to stop at some point, and finally stops once every outstanding operation
//! has been resolved and the worker has exited. On top of this lifecycle, the
//! worker keeps a few counters which let clients monitor its activity.

use std::fmt;


/// Lifecycle of an executor
///
/// Here are the possible state transitions:
///
/// - Created -> Running / Stopped
/// - Running -> Stopping
/// - Stopping -> Stopped
///
/// Once an executor is Stopped, its state won't change anymore.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    /// The executor exists, but its worker has not been started yet
    Created,

    /// The worker is polling and dispatching watched operations
    Running,

    /// The worker was asked to stop and is resolving outstanding operations
    Stopping,

    /// The worker has exited, no operation is outstanding anymore
    Stopped,
}
//
impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Lifecycle::Created => "created",
            Lifecycle::Running => "running",
            Lifecycle::Stopping => "stopping",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}


/// Check if an executor lifecycle state is final (i.e. won't change anymore)
pub fn is_final(l: Lifecycle) -> bool {
    match l {
        Lifecycle::Created | Lifecycle::Running | Lifecycle::Stopping => false,
        Lifecycle::Stopped => true,
    }
}


/// Check if an executor in this state still accepts new operations
pub fn accepts_operations(l: Lifecycle) -> bool {
    match l {
        Lifecycle::Created | Lifecycle::Running => true,
        Lifecycle::Stopping | Lifecycle::Stopped => false,
    }
}


/// Snapshot of an executor's activity, as published by its worker
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutorStatus {
    /// Current lifecycle state
    pub lifecycle: Lifecycle,

    /// Number of operations currently being polled
    pub active: usize,

    /// Number of operations completed because they became ready
    pub dispatched: u64,

    /// Number of operations completed because their deadline elapsed
    pub timed_out: u64,

    /// Number of operations force-completed because the executor stopped
    pub stopped: u64,
}
//
impl ExecutorStatus {
    /// Total number of operations which were resolved so far
    pub fn resolved(&self) -> u64 {
        self.dispatched + self.timed_out + self.stopped
    }
}


/// Status of an executor that never did anything
pub const CREATED: ExecutorStatus = ExecutorStatus {
    lifecycle: Lifecycle::Created,
    active: 0,
    dispatched: 0,
    timed_out: 0,
    stopped: 0,
};
